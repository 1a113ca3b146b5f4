use std::collections::HashMap;

use serenity::all::{ChannelId, UserId};

use crate::error::BotError;

/// A guild category referenced by id. The name is captured when the category
/// is offered so buttons and dropdowns can be drawn without another lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRef {
    pub id: ChannelId,
    pub name: String,
}

/// The outcome of a toggle, used to pick the button style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Selected,
    Deselected,
}

/// The categories each user has approved for temporary channels.
///
/// Each selection is an ordered set: a category appears at most once and keeps
/// the position it was first toggled on in.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    selections: HashMap<UserId, Vec<CategoryRef>>,
}

impl CategoryRegistry {
    /// Flip the membership of `category` in the user's selection
    pub fn toggle(&mut self, user_id: UserId, category: &CategoryRef) -> Toggle {
        let selection = self.selections.entry(user_id).or_default();

        match selection.iter().position(|c| c.id == category.id) {
            Some(index) => {
                selection.remove(index);
                Toggle::Deselected
            }
            None => {
                selection.push(category.clone());
                Toggle::Selected
            }
        }
    }

    pub fn selections(&self, user_id: UserId) -> &[CategoryRef] {
        self.selections
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_selected(&self, user_id: UserId, category_id: ChannelId) -> bool {
        self.selections(user_id).iter().any(|c| c.id == category_id)
    }

    /// Check that the user has approved at least one category. The selection
    /// stays mutable afterwards.
    pub fn finish(&self, user_id: UserId) -> Result<&[CategoryRef], BotError> {
        let selection = self.selections(user_id);

        if selection.is_empty() {
            return Err(BotError::EmptySelection);
        }

        Ok(selection)
    }
}
