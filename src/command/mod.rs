use color_eyre::eyre::Report;
use poise::Command;

use crate::data::{config::AppConfig, Data};

macro_rules! commands {
    ($($name:ident),* $(,)?) => {
        $(
            pub mod $name;
        )*

        pub fn commands(config: &AppConfig) -> Vec<Command<Data, Report>> {
            vec![$( $name::command(config) ),*]
        }
    };
}

commands! {
    add_bot_channels,
    clear,
    dropdown_setup,
}

macro_rules! command {
    (
        $is_admin:literal;
        $(#[$attr:meta])*
        pub async fn $name:ident($($arg:ident: $arg_ty:ty),*) -> Result<$ret_ty:ty> $body:block
    ) => {
        pub fn command(config: & $crate::data::config::AppConfig) -> ::poise::Command<$crate::data::Data, ::color_eyre::eyre::Report> {
            let mut cmd = $name();

            if $is_admin {
                // hides the command from members and rejects anyone who
                // invokes it anyway
                cmd.default_member_permissions = *config.admin_permissions;
                cmd.required_permissions = *config.admin_permissions;
            }

            cmd
        }

        $(#[$attr])*
        #[::poise::command(slash_command, guild_only)]
        async fn $name($($arg: $arg_ty),*) -> ::color_eyre::eyre::Result<$ret_ty> $body
    };
}

pub(crate) use command;
