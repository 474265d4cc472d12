use lazy_static::lazy_static;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::utils;
use crate::{bot_handler::CallbackAction, pagination::Paginated, storage::BookSummary};

pub fn button(text: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(text, utils::serialize_action(&action))
}

/// One button per row.
pub fn column<I>(buttons: I) -> InlineKeyboardMarkup
where
    I: IntoIterator<Item = (String, CallbackAction)>,
{
    InlineKeyboardMarkup::new(buttons.into_iter().map(|(text, action)| vec![button(text, action)]))
}

pub fn back(action: CallbackAction) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![button("🔙 Назад", action)]])
}

pub fn build_main_menu_keyboard(is_admin: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![
        vec![
            button("📚 Поиск книг", CallbackAction::FindBook),
            button("🤖 Чат с ИИ", CallbackAction::ChatWithAi),
        ],
        vec![
            button("💳 Подписки", CallbackAction::Subscriptions),
            button("🎮 Игры", CallbackAction::Games),
        ],
        vec![button("📚 Моя библиотека", CallbackAction::Library(1))],
        vec![button("ℹ️ Помощь", CallbackAction::Help)],
    ];
    if is_admin {
        rows.push(vec![button("🔒 Админ панель", CallbackAction::AdminPanel)]);
    }
    InlineKeyboardMarkup::new(rows)
}

pub fn build_library_keyboard(books: &Paginated<BookSummary>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = books
        .get_page_items()
        .iter()
        .map(|book| vec![button(book.title.clone(), CallbackAction::BookOptions(book.id))])
        .collect();

    let mut navigation = Vec::new();
    if books.has_prev() {
        navigation.push(button("◀️ Назад", CallbackAction::Library(books.page - 1)));
    }
    if books.has_next() {
        navigation.push(button("Вперёд ▶️", CallbackAction::Library(books.page + 1)));
    }
    if !navigation.is_empty() {
        rows.push(navigation);
    }

    rows.push(vec![button("🔙 Назад в меню", CallbackAction::Menu)]);
    InlineKeyboardMarkup::new(rows)
}

lazy_static! {
    pub static ref BACK_TO_MENU: InlineKeyboardMarkup =
        InlineKeyboardMarkup::new(vec![vec![button("🔙 Назад в меню", CallbackAction::Menu)]]);
}
