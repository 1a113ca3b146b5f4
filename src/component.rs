//! Custom ids and builders for every interactive control the bot sends.
//!
//! Controls carry no state of their own. Their custom id names the action and
//! the session it belongs to, and the interaction handler looks the session up
//! when the control is used.

use std::fmt;

use lazy_regex::regex_captures;
use serenity::all::{
    ActionRow, ActionRowComponent, ButtonStyle, ChannelId, CreateActionRow, CreateButton,
    CreateInputText, CreateModal, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
    InputTextStyle,
};

use crate::{data::state::CategoryButton, form::RawSetupForm, registry::CategoryRef, session::SessionId};

/// Discord allows five buttons per row and five rows per message. The last row
/// is taken by the finish button.
pub const BUTTONS_PER_ROW: usize = 5;
pub const MAX_CATEGORY_BUTTONS: usize = BUTTONS_PER_ROW * 4;
/// Discord's limit on select menu options
pub const MAX_SELECT_OPTIONS: usize = 25;
/// Discord's limit on button label length, in characters
pub const MAX_BUTTON_LABEL: usize = 80;

pub const FIELD_NAME: &str = "name";
pub const FIELD_LIMIT: &str = "limit";
pub const FIELD_PRIVACY: &str = "privacy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentId {
    /// A category button in the selection grid
    Toggle {
        session: SessionId,
        category: ChannelId,
    },
    /// "Finish Selection"
    Finish { session: SessionId },
    /// The category dropdown of a setup prompt
    Pick { session: SessionId },
    /// "Continue Setup"
    Continue { session: SessionId },
    /// The setup modal
    Form { session: SessionId },
}

impl ComponentId {
    /// Parse a custom id. Returns `None` for ids that aren't ours.
    pub fn parse(custom_id: &str) -> Option<Self> {
        let (_, action, session, category) =
            regex_captures!(r"^reaper:([a-z]+):(\d+)(?::(\d+))?$", custom_id)?;

        let session = SessionId(session.parse().ok()?);

        let id = match (action, category) {
            ("toggle", category) if !category.is_empty() => ComponentId::Toggle {
                session,
                category: parse_channel_id(category)?,
            },
            ("finish", "") => ComponentId::Finish { session },
            ("pick", "") => ComponentId::Pick { session },
            ("continue", "") => ComponentId::Continue { session },
            ("form", "") => ComponentId::Form { session },
            _ => return None,
        };

        Some(id)
    }
}

fn parse_channel_id(raw: &str) -> Option<ChannelId> {
    match raw.parse::<u64>().ok()? {
        0 => None,
        id => Some(ChannelId::new(id)),
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Toggle { session, category } => {
                write!(f, "reaper:toggle:{session}:{category}")
            }
            ComponentId::Finish { session } => write!(f, "reaper:finish:{session}"),
            ComponentId::Pick { session } => write!(f, "reaper:pick:{session}"),
            ComponentId::Continue { session } => write!(f, "reaper:continue:{session}"),
            ComponentId::Form { session } => write!(f, "reaper:form:{session}"),
        }
    }
}

/// The category grid of a selection session followed by the finish button
pub fn selection_rows(session: SessionId, buttons: &[CategoryButton]) -> Vec<CreateActionRow> {
    let mut rows: Vec<_> = buttons
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| {
            CreateActionRow::Buttons(
                chunk
                    .iter()
                    .map(|button| {
                        let id = ComponentId::Toggle {
                            session,
                            category: button.category.id,
                        };

                        CreateButton::new(id.to_string())
                            .label(button_label(&button.category.name))
                            .style(if button.active {
                                ButtonStyle::Primary
                            } else {
                                ButtonStyle::Secondary
                            })
                    })
                    .collect(),
            )
        })
        .collect();

    rows.push(CreateActionRow::Buttons(vec![CreateButton::new(
        ComponentId::Finish { session }.to_string(),
    )
    .label("Finish Selection")
    .style(ButtonStyle::Success)]));

    rows
}

/// Category names may be longer than a button label allows
fn button_label(name: &str) -> String {
    if name.chars().count() <= MAX_BUTTON_LABEL {
        return name.to_string();
    }

    let mut label: String = name.chars().take(MAX_BUTTON_LABEL - 1).collect();
    label.push('…');
    label
}

/// The category dropdown and continue button posted when a member joins the
/// sentinel
pub fn setup_prompt_rows(session: SessionId, categories: &[CategoryRef]) -> Vec<CreateActionRow> {
    let options = categories
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|category| CreateSelectMenuOption::new(&category.name, category.id.to_string()))
        .collect();

    let dropdown = CreateSelectMenu::new(
        ComponentId::Pick { session }.to_string(),
        CreateSelectMenuKind::String { options },
    )
    .placeholder("Choose a category");

    let continue_button = CreateButton::new(ComponentId::Continue { session }.to_string())
        .label("Continue Setup")
        .style(ButtonStyle::Primary);

    vec![
        CreateActionRow::SelectMenu(dropdown),
        CreateActionRow::Buttons(vec![continue_button]),
    ]
}

pub fn setup_modal(session: SessionId) -> CreateModal {
    let name = CreateInputText::new(InputTextStyle::Short, "Channel Name", FIELD_NAME)
        .placeholder("Enter the name for your channel")
        .required(true)
        .max_length(100);

    let limit = CreateInputText::new(InputTextStyle::Short, "User Limit", FIELD_LIMIT)
        .placeholder("Enter a number for max users (0 for unlimited)")
        .required(true)
        .max_length(2);

    let privacy = CreateInputText::new(InputTextStyle::Short, "Privacy", FIELD_PRIVACY)
        .placeholder("Type 'public' or 'private' for channel visibility")
        .required(true)
        .max_length(10);

    CreateModal::new(
        ComponentId::Form { session }.to_string(),
        "Temporary Channel Setup",
    )
    .components(vec![
        CreateActionRow::InputText(name),
        CreateActionRow::InputText(limit),
        CreateActionRow::InputText(privacy),
    ])
}

/// Pull the three setup fields out of a submitted modal. Missing fields come
/// back empty.
pub fn read_form(rows: &[ActionRow]) -> RawSetupForm {
    let mut form = RawSetupForm::default();

    for component in rows.iter().flat_map(|row| &row.components) {
        let ActionRowComponent::InputText(input) = component else {
            continue;
        };

        let value = input.value.clone().unwrap_or_default();

        match input.custom_id.as_str() {
            FIELD_NAME => form.name = value,
            FIELD_LIMIT => form.limit = value,
            FIELD_PRIVACY => form.privacy = value,
            other => trace!(field = other, "ignoring unknown form field"),
        }
    }

    form
}
