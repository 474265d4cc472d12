//! Texts and keyboards of every screen the bot shows. Builders are pure so
//! handlers and background tasks can share them and tests can inspect them.

use std::ops::RangeInclusive;

use chrono::{Duration, NaiveDate};
use teloxide::{
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup},
    utils::{command::BotCommands, html},
};
use url::Url;

use super::{
    Screen,
    keyboards::{self, BACK_TO_MENU, button},
    utils::format_date,
};
use crate::{
    account::{BookAccess, ChatQuota, Statistics, SubscriptionStatus, UserProfile},
    bot_handler::{CallbackAction, Command},
    generation::{Addon, AddonSet, BookLanguage},
    notifications::BroadcastReport,
    pagination::Paginated,
    settings::{SettingKey, Settings},
    storage::{BookSummary, LibraryBookEntity, PlanEntity, SubscriptionEntity},
};

/// Shown when a non-admin presses an admin button.
pub const ACCESS_DENIED: &str = "У вас нет прав для доступа к админ панели";

fn tr(language: BookLanguage, ru: &'static str, en: &'static str) -> &'static str {
    match language {
        BookLanguage::Russian => ru,
        BookLanguage::English => en,
    }
}

fn back_to_menu(language: BookLanguage) -> InlineKeyboardMarkup {
    match language {
        BookLanguage::Russian => BACK_TO_MENU.clone(),
        BookLanguage::English => InlineKeyboardMarkup::new(vec![vec![button(
            "🔙 Back to menu",
            CallbackAction::Menu,
        )]]),
    }
}

pub fn main_menu(name: &str, is_admin: bool) -> Screen {
    let text = format!(
        "🌟 Здравствуйте, {}! 👋\n\nМы рады видеть вас в нашем боте! 😊\nВыберите одну из опций ниже:👇",
        html::escape(name)
    );
    Screen::new(text, keyboards::build_main_menu_keyboard(is_admin))
}

pub fn help() -> Screen {
    let text = format!(
        "📚 Бот создаёт краткие пересказы книг.\n\n\
         1️⃣ Откройте «Поиск книг» и выберите язык.\n\
         2️⃣ Отметьте дополнения: анализ, цитаты, биографию автора или критику.\n\
         3️⃣ Напишите название книги и количество страниц.\n\n\
         Готовая книга придёт файлом и сохранится в вашей библиотеке.\n\n{}",
        html::escape(&Command::descriptions().to_string())
    );
    Screen::new(text, BACK_TO_MENU.clone())
}

pub fn games() -> Screen {
    Screen::new(
        "🎮 Раздел 'Игры' скоро будет доступен! 🔜\n\
         Следите за обновлениями, чтобы первыми узнать о новых играх. 🚀",
        BACK_TO_MENU.clone(),
    )
}

pub fn use_start() -> Screen {
    Screen::new("Используйте /start для выбора режима.", BACK_TO_MENU.clone())
}

// Library

pub fn library(books: &Paginated<BookSummary>) -> Screen {
    if books.is_empty() {
        let keyboard = InlineKeyboardMarkup::new(vec![
            vec![button("📚 Поиск книг", CallbackAction::FindBook)],
            vec![button("🔙 Назад в меню", CallbackAction::Menu)],
        ]);
        return Screen::new("📚 Ваша библиотека пуста. Добавьте книги через поиск!", keyboard);
    }

    let page_info = if books.total_pages > 1 {
        format!(" (страница {} из {})", books.page, books.total_pages)
    } else {
        String::new()
    };
    Screen::new(
        format!("📚 Ваши книги{page_info}\n\nВыберите книгу, чтобы выполнить действия с ней"),
        keyboards::build_library_keyboard(books),
    )
}

pub fn book_options(book: &LibraryBookEntity) -> Screen {
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button("📤 Прислать книгу в чат", CallbackAction::SendBook(book.id))],
        vec![button("🗑️ Удалить книгу", CallbackAction::DeleteBook(book.id))],
        vec![button("🔙 Назад", CallbackAction::Library(1))],
    ]);
    Screen::new(
        format!("📘 Вы выбрали книгу: {}\n\nВыберите действие", html::escape(&book.title)),
        keyboard,
    )
}

pub fn book_missing() -> Screen {
    Screen::new("⚠️ Книга не найдена или удалена", keyboards::back(CallbackAction::Library(1)))
}

pub fn book_deleted(title: &str, books: &Paginated<BookSummary>) -> Screen {
    let library = library(books);
    Screen {
        text: format!(
            "🗑️ Книга '{}' была успешно удалена из вашей библиотеки\n\n{}",
            html::escape(title),
            library.text
        ),
        keyboard: library.keyboard,
    }
}

pub fn book_sent(title: &str) -> Screen {
    Screen::new(
        format!("📤 Книга {} успешно отправлена в чат!", html::escape(title)),
        keyboards::back(CallbackAction::Library(1)),
    )
}

// Subscriptions

pub fn subscriptions(status: &SubscriptionStatus) -> Screen {
    let (label, text) = match status {
        SubscriptionStatus::Active(sub) => (
            "🟢 Подписка активна",
            format!(
                "✅ Ваша подписка '{}' активна до {}.",
                html::escape(&sub.plan_name),
                format_date(sub.end_date)
            ),
        ),
        SubscriptionStatus::Expired(sub) => (
            "🔴 Подписка истекла",
            format!(
                "❌ Ваша подписка '{}' истекла {}.\n💸 Оформите новую подписку.",
                html::escape(&sub.plan_name),
                format_date(sub.end_date)
            ),
        ),
        SubscriptionStatus::None => (
            "⚪️ Нет подписки",
            "❌ У вас нет подписки.\n💸 Оформите подписку, чтобы получить доступ к функциям."
                .to_string(),
        ),
    };

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button(label, CallbackAction::SubscriptionDetails)],
        vec![button("📚 Все подписки", CallbackAction::Plans)],
        vec![button("🔙 Назад в меню", CallbackAction::Menu)],
    ]);
    Screen::new(format!("{text}\n\n✨ Выберите действие:"), keyboard)
}

pub fn subscription_details(status: &SubscriptionStatus) -> Screen {
    let text = match status {
        SubscriptionStatus::Active(sub) => format!(
            "🟢 У вас активная подписка: {}\n💰 Цена: {} руб.\n📅 Действует до: {}",
            html::escape(&sub.plan_name),
            sub.price,
            format_date(sub.end_date)
        ),
        SubscriptionStatus::Expired(sub) => format!(
            "❌ Ваша подписка '{}' истекла.\n💰 Цена была: {} руб.\n📅 Срок действия истек: {}\n\
             💸 Оформите новую подписку, чтобы продолжить пользоваться сервисом.",
            html::escape(&sub.plan_name),
            sub.price,
            format_date(sub.end_date)
        ),
        SubscriptionStatus::None => "⚠️ У вас пока нет подписки.".to_string(),
    };
    Screen::new(text, keyboards::back(CallbackAction::Subscriptions))
}

pub fn plans(plans: &[PlanEntity]) -> Screen {
    if plans.is_empty() {
        return Screen::new("⚠️ Подписок пока нет", keyboards::back(CallbackAction::Subscriptions));
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = plans
        .iter()
        .map(|plan| vec![button(plan.name.clone(), CallbackAction::PlanDetails(plan.id))])
        .collect();
    rows.push(vec![button("🔙 Назад", CallbackAction::Subscriptions)]);
    Screen::new("✨ Выберите подписку", InlineKeyboardMarkup::new(rows))
}

pub fn plan_details(plan: &PlanEntity, days: u32, end_date: NaiveDate) -> Screen {
    let text = format!(
        "📝 <b>Оформление подписки</b>\n\n\
         ✨ Подписка: {}\n\
         ⏳ Срок действия: {days} дней\n\
         💰 Цена: {} руб.\n\
         📅 Закончится: {}\n\n\
         🔑 Оформите подписку, чтобы получить доступ ко всем возможностям!",
        html::escape(&plan.name),
        plan.price,
        format_date(end_date)
    );
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button("💸 Оформить подписку", CallbackAction::BuyPlan(plan.id))],
        vec![button("🔙 Назад к подпискам", CallbackAction::Plans)],
    ]);
    Screen::new(text, keyboard)
}

pub fn plan_missing() -> Screen {
    Screen::new("❌ Подписка не найдена.", keyboards::back(CallbackAction::Plans))
}

pub fn already_subscribed(sub: &SubscriptionEntity) -> Screen {
    Screen::new(
        format!(
            "⚠️ У вас уже есть активная подписка: {}.\n📅 Действующая до {}.\n\n\
             Вы не можете купить новую подписку, пока не истечёт текущая.",
            html::escape(&sub.plan_name),
            format_date(sub.end_date)
        ),
        BACK_TO_MENU.clone(),
    )
}

pub fn payment_link(plan_name: &str, url: Url) -> Screen {
    let text = format!(
        "💡 <b>Для активации подписки '{}' выполните следующие шаги:</b>\n\n\
         1️⃣ Нажмите на кнопку 💳 <b>Оплатить</b> ниже и перейдите на сайт оплаты.\n\
         2️⃣ После успешной оплаты подписка будет активна!\n\n\
         ⏳ <i>Ожидается подтверждение оплаты...</i>",
        html::escape(plan_name)
    );
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::url("💳 Оплатить", url)],
        vec![button("🔙 Назад в меню", CallbackAction::Menu)],
    ]);
    Screen::new(text, keyboard)
}

pub fn payment_unavailable() -> Screen {
    Screen::new(
        "⚠️ Не удалось создать платёж. Попробуйте позже.",
        keyboards::back(CallbackAction::Plans),
    )
}

pub fn payment_pending() -> Screen {
    Screen::new(
        "⏳ У вас уже есть неоплаченный счёт. Завершите оплату или дождитесь её отмены.",
        keyboards::back(CallbackAction::Plans),
    )
}

pub fn payment_succeeded(plan_name: &str, end_date: NaiveDate) -> Screen {
    Screen::new(
        format!(
            "✅ Подписка '{}' успешно активирована!\n\n📅 Действует до {}.",
            html::escape(plan_name),
            format_date(end_date)
        ),
        BACK_TO_MENU.clone(),
    )
}

pub fn payment_activation_failed(payment_id: &str) -> Screen {
    Screen::new(
        format!(
            "⚠️ Оплата получена, но подписку не удалось активировать.\n\
             Обратитесь к администратору и укажите номер платежа: <code>{}</code>",
            html::escape(payment_id)
        ),
        BACK_TO_MENU.clone(),
    )
}

pub fn payment_canceled() -> Screen {
    Screen::new("⚠️ Оплата подписки была отменена.\nПопробуйте снова.", BACK_TO_MENU.clone())
}

pub fn payment_timed_out() -> Screen {
    Screen::new(
        "⌛ Время ожидания оплаты истекло.\nЕсли вы уже оплатили, обратитесь к администратору.",
        BACK_TO_MENU.clone(),
    )
}

// Book search

pub fn choose_language(access: &BookAccess) -> Screen {
    let text = if access.limited {
        format!(
            "🔒 У вас нет активной подписки, поэтому функции поиска книг будут ограничены:\n\n\
             1️⃣ Максимальное количество страниц: от {} до {}.\n\
             2️⃣ Кол-во книг в день ограничено до {}\n\
             🌐 Выберите язык книги, чтобы продолжить поиск:",
            access.page_range.start(),
            access.page_range.end(),
            access.daily_limit
        )
    } else {
        "🌐 Выберите язык книги:".to_string()
    };
    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![button("🇷🇺 Русский", CallbackAction::ChooseLanguage(BookLanguage::Russian))],
        vec![button("🇬🇧 Английский", CallbackAction::ChooseLanguage(BookLanguage::English))],
        vec![button("🔙 Назад в меню", CallbackAction::Menu)],
    ]);
    Screen::new(text, keyboard)
}

fn addon_label(language: BookLanguage, addon: Addon) -> &'static str {
    match addon {
        Addon::Analysis => tr(language, "Ключ.идеи,анализ", "Key Ideas, Analysis"),
        Addon::Quotes => tr(language, "Цитаты из книги", "Quotes in the book"),
        Addon::Biography => tr(language, "Биография автора", "Author's Biography"),
        Addon::Critique => tr(language, "Критика книги", "Book Critique"),
    }
}

pub fn addons(language: BookLanguage, addons: AddonSet) -> Screen {
    let text = if addons.is_full() {
        tr(
            language,
            "✅ Все опции выбраны. Вы можете убрать все:",
            "✅ All options are selected. You can remove everything:",
        )
    } else {
        tr(language, "✏️ Теперь выберите опции:", "✏️ Now select options:")
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Addon::ALL
        .into_iter()
        .map(|addon| {
            let mark = if addons.contains(addon) { "✅" } else { "❌" };
            vec![button(
                format!("{} {mark}", addon_label(language, addon)),
                CallbackAction::ToggleAddon(addon),
            )]
        })
        .collect();

    let done = if addons.is_empty() {
        tr(language, "⏩ Пропустить", "⏩ Skip")
    } else {
        tr(language, "➡️ Далее", "➡️ Next")
    };
    rows.push(vec![button(done, CallbackAction::AddonsDone)]);
    rows.push(vec![if addons.is_full() {
        button(tr(language, "❌ Убрать все", "❌ Remove All"), CallbackAction::RemoveAllAddons)
    } else {
        button(tr(language, "✅ Выбрать все", "✅ Select All"), CallbackAction::SelectAllAddons)
    }]);
    rows.push(vec![button(tr(language, "🔙 Назад", "🔙 Back"), CallbackAction::FindBook)]);

    Screen::new(text, InlineKeyboardMarkup::new(rows))
}

pub fn book_title_prompt(language: BookLanguage) -> Screen {
    Screen::new(
        tr(
            language,
            "✏️ Какую книгу вы хотите разобрать?\nНапишите название",
            "✏️ Which book do you want to review?\nWrite the name",
        ),
        back_to_menu(language),
    )
}

pub fn book_found(language: BookLanguage, title: &str, pages: &RangeInclusive<u32>) -> Screen {
    let title = html::escape(title);
    let (start, end) = (pages.start(), pages.end());
    let text = match language {
        BookLanguage::Russian => format!(
            "📚 Книга {title} найдена! 🎉\n📖 Сколько страниц в этой книге вы хотите? (от {start} до {end})"
        ),
        BookLanguage::English => format!(
            "📚 Book {title} found! 🎉\n📖 How many pages in this book do you want? (from {start} to {end})"
        ),
    };
    let wrong_book = tr(language, "❌ Это не та книга", "❌ This is the wrong book");
    Screen::new(text, InlineKeyboardMarkup::new(vec![vec![button(wrong_book, CallbackAction::Menu)]]))
}

pub fn book_not_found(language: BookLanguage, title: &str) -> Screen {
    let title = html::escape(title);
    let text = match language {
        BookLanguage::Russian => format!("❌ Книга '{title}' не найдена. Попробуйте другое название"),
        BookLanguage::English => format!("❌ Book '{title}' not found. Try a different name"),
    };
    Screen::new(text, back_to_menu(language))
}

pub fn outline_failed(language: BookLanguage) -> Screen {
    Screen::new(
        tr(language, "❌ Произошла ошибка. Попробуйте заново", "❌ An error has occurred. Try again"),
        back_to_menu(language),
    )
}

pub fn page_count_not_a_number(language: BookLanguage) -> Screen {
    Screen::plain(tr(
        language,
        "✏️ Пожалуйста, укажите количество страниц числом",
        "✏️ Please indicate the number of pages as a number",
    ))
}

pub fn page_count_out_of_range(language: BookLanguage, pages: &RangeInclusive<u32>) -> Screen {
    let (start, end) = (pages.start(), pages.end());
    Screen::plain(match language {
        BookLanguage::Russian => format!("✏️ Количество страниц должно быть от {start} до {end}"),
        BookLanguage::English => {
            format!("✏️ The number of pages should be from {start} to {end}")
        }
    })
}

pub fn book_limit_reached(language: BookLanguage, limited: bool) -> Screen {
    let text = match (language, limited) {
        (BookLanguage::Russian, true) => {
            "❌ Лимит книг на сегодня исчерпан.\nПопробуйте завтра! 🕒\n📝 Либо оформите подписку."
        }
        (BookLanguage::Russian, false) => "❌ Лимит книг на сегодня исчерпан.\nПопробуйте завтра! 🕒",
        (BookLanguage::English, true) => {
            "❌ The book limit for today has been reached.\nTry tomorrow! 🕒\n📝 Or subscribe."
        }
        (BookLanguage::English, false) => {
            "❌ The book limit for today has been reached.\nTry tomorrow! 🕒"
        }
    };
    Screen::new(text, back_to_menu(language))
}

pub fn book_in_progress(language: BookLanguage) -> Screen {
    Screen::new(
        tr(
            language,
            "⚠️ Вы уже запустили процесс создания книги. Пожалуйста, подождите, пока завершится обработка предыдущей.",
            "⚠️ You have already started the process of creating a book. Please wait while the previous one is processed.",
        ),
        back_to_menu(language),
    )
}

pub fn book_started(language: BookLanguage) -> Screen {
    Screen::new(
        tr(
            language,
            "📚 Обработка книги началась. Вы можете продолжить пользоваться ботом, пока книга создается!",
            "📚 Processing of the book has begun. You can continue to use the bot while the book is being created!",
        ),
        back_to_menu(language),
    )
}

pub fn book_ready(language: BookLanguage, title: &str) -> Screen {
    let title = html::escape(title);
    let text = match language {
        BookLanguage::Russian => {
            format!("📚 Книга {title} готова! 🎉\n📚 Книга успешно добавлена в вашу библиотеку! 🎉")
        }
        BookLanguage::English => format!(
            "📚 Book {title} is ready! 🎉\n📚 The book has been successfully added to your library! 🎉"
        ),
    };
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        button(tr(language, "📚 Моя библиотека", "📚 My library"), CallbackAction::Library(1)),
        button(tr(language, "🔙 Назад в меню", "🔙 Back to menu"), CallbackAction::Menu),
    ]]);
    Screen::new(text, keyboard)
}

pub fn book_failed(language: BookLanguage) -> Screen {
    Screen::new(
        tr(
            language,
            "❌ Не удалось создать книгу. Попробуйте позже",
            "❌ Failed to create the book. Try again later",
        ),
        back_to_menu(language),
    )
}

// Chat with AI

/// `quota` is set for users on the free tier.
pub fn chat_start(quota: Option<ChatQuota>) -> Screen {
    let text = match quota {
        Some(ChatQuota { used, limit }) => format!(
            "📉 <b>У вас нет активной подписки</b>, и доступ к чату с ИИ ограничен.\n\n\
             📱 Ваш текущий лимит на отправку сообщений: {used}/{limit}.\n\n\
             💬 Вы можете продолжать использовать чат, пока не превысите лимит сообщений.\n\
             Как только лимит будет исчерпан, начнётся отсчёт времени до снятия лимита.\n\n\
             💡 Чтобы получить полный доступ, оформите подписку!\n\
             💬 Задавайте ваши вопросы! Я всегда готов помочь вам. 😊"
        ),
        None => "💬 Задавайте ваши вопросы! Я всегда готов вам помочь. 😊".to_string(),
    };
    Screen::new(text, BACK_TO_MENU.clone())
}

pub fn chat_limit_reached(limit: u32, wait: Duration) -> Screen {
    let wait = wait.max(Duration::zero());
    let hours = wait.num_hours();
    let minutes = wait.num_minutes() % 60;
    Screen::new(
        format!(
            "⏳ Вы достигли лимита в {limit} сообщений! 📩\n\n\
             🔒 Ваш лимит будет автоматически сброшен через {hours} часов и {minutes} минут.\n\n\
             💎 Хотите больше возможностей? Оформите подписку, чтобы отключить лимит!"
        ),
        BACK_TO_MENU.clone(),
    )
}

pub fn chat_unavailable() -> Screen {
    Screen::plain("⚠️ Не удалось получить ответ. Попробуйте ещё раз.")
}

// Admin panel

pub fn admin_panel() -> Screen {
    let keyboard = keyboards::column([
        ("👥 Управление пользователями".to_string(), CallbackAction::UserManagement),
        ("💳 Управление подписками".to_string(), CallbackAction::ManagePlans),
        ("🔔 Уведомления".to_string(), CallbackAction::Notifications),
        ("📈 Статистика".to_string(), CallbackAction::Statistics),
        ("⚙️ Режимы".to_string(), CallbackAction::Modes),
        ("🔙 Назад в меню".to_string(), CallbackAction::Menu),
    ]);
    Screen::new("Админ панель", keyboard)
}

pub fn statistics(stats: &Statistics) -> Screen {
    Screen::new(
        format!(
            "📈 <b>Статистика</b>\n\n\
             👥 Пользователей всего: {}\n\
             🔑 Пользователи с подпиской: {}\n\
             🚫 Пользователи без подписки: {}\n\
             🤖 Чат с ИИ использовался: {} раз(а)\n\
             📚 Поиск книг использовался: {} раз(а)",
            stats.total_users,
            stats.subscribed_users,
            stats.unsubscribed_users,
            stats.chat_messages,
            stats.book_searches
        ),
        keyboards::back(CallbackAction::AdminPanel),
    )
}

pub fn user_management() -> Screen {
    let keyboard = keyboards::column([
        ("🔍 Найти пользователя".to_string(), CallbackAction::FindUser),
        ("🔙 Назад".to_string(), CallbackAction::AdminPanel),
    ]);
    Screen::new("Выберите действие с пользователями", keyboard)
}

pub fn user_search_prompt() -> Screen {
    Screen::new(
        "🔍 Пожалуйста, укажите <b>ID</b> или <b>username</b> пользователя, которого хотите найти.\n\
         Пример:\n\
         - Для поиска по ID: просто введите его число.\n\
         - Для поиска по username: введите имя пользователя.",
        keyboards::back(CallbackAction::UserManagement),
    )
}

pub fn user_profile(profile: &UserProfile) -> Screen {
    let (plan, status) = match &profile.subscription {
        SubscriptionStatus::Active(sub) => {
            (sub.plan_name.as_str(), format!("Активна до {}", format_date(sub.end_date)))
        }
        SubscriptionStatus::Expired(_) => ("Нет", "Истекла".to_string()),
        SubscriptionStatus::None => ("Нет", "Нет активной подписки".to_string()),
    };
    let username = profile
        .user
        .username
        .as_deref()
        .map_or_else(|| "—".to_string(), |name| format!("@{}", html::escape(name)));

    Screen::new(
        format!(
            "Информация о пользователе:\n\n\
             🆔 ID: <code>{}</code>\n\
             👤 Имя: {}\n\
             🔗 Username: {username}\n\
             📚 Создано книг: {}\n\
             📜 Подписка: {} ({status})",
            profile.user.id,
            html::escape(&profile.user.first_name),
            profile.books_created,
            html::escape(plan)
        ),
        keyboards::back(CallbackAction::UserManagement),
    )
}

pub fn user_search_not_found() -> Screen {
    Screen::new(
        "⚠️ Пользователь которого ищите не найден, укажите верные данные",
        keyboards::back(CallbackAction::UserManagement),
    )
}

pub fn notifications() -> Screen {
    use crate::account::Audience;

    let keyboard = keyboards::column([
        ("📢 Для всех".to_string(), CallbackAction::Broadcast(Audience::All)),
        ("📢 Для тех кто подписан".to_string(), CallbackAction::Broadcast(Audience::Subscribed)),
        ("📢 Для тех кто не подписан".to_string(), CallbackAction::Broadcast(Audience::Unsubscribed)),
        ("📢 Для отдельного пользователя".to_string(), CallbackAction::DirectMessage),
        ("🔙 Назад".to_string(), CallbackAction::AdminPanel),
    ]);
    Screen::new("Выберите аудиторию для уведомления", keyboard)
}

pub fn broadcast_prompt() -> Screen {
    Screen::new(
        "✏️ Напишите текст уведомления, который будет отправлен вашим пользователям.\n\n\
         Вы можете добавить кнопки в уведомление. Для этого используйте следующий формат:\n\
         <code>Текст кнопки|Ссылка</code>\n\n\
         Пример:\n\
         🎉 Новое обновление! 🎉\n\
         Подробнее|https://example.com\n\n\
         🔙 Для отмены вернитесь назад, выбрав кнопку ниже.",
        keyboards::back(CallbackAction::Notifications),
    )
}

pub fn direct_recipient_prompt() -> Screen {
    Screen::new(
        "🔍 Пожалуйста, введите ID пользователя, которому хотите отправить уведомление:",
        keyboards::back(CallbackAction::Notifications),
    )
}

pub fn direct_recipient_invalid() -> Screen {
    Screen::plain("⚠️ Неверный ID пользователя. Введите числовой ID.")
}

pub fn direct_recipient_missing() -> Screen {
    Screen::new(
        "⚠️ Пользователь с таким ID не найден.",
        keyboards::back(CallbackAction::Notifications),
    )
}

pub fn broadcast_invalid(reason: &str) -> Screen {
    Screen::plain(format!("⚠️ {}", html::escape(reason)))
}

pub fn broadcast_report(report: &BroadcastReport) -> Screen {
    Screen::new(
        format!(
            "✅ Уведомления отправлены!\n\n📬 Доставлено: {}\n⚠️ Не доставлено: {}",
            report.delivered, report.failed
        ),
        keyboards::back(CallbackAction::Notifications),
    )
}

pub fn direct_sent(recipient: ChatId) -> Screen {
    Screen::new(
        format!("✅ Уведомление отправлено пользователю {recipient}!"),
        keyboards::back(CallbackAction::Notifications),
    )
}

pub fn modes() -> Screen {
    let keyboard = keyboards::column([
        ("📚 Поиск книг".to_string(), CallbackAction::BookSettings),
        ("🤖 Чат с ИИ".to_string(), CallbackAction::ChatSettings),
        ("🔙 Назад".to_string(), CallbackAction::AdminPanel),
    ]);
    Screen::new("Выберите действие:", keyboard)
}

pub fn book_settings() -> Screen {
    let keyboard = keyboards::column([
        (
            "✏️ Ограничение на макс. кол-во стрн. (без подписки)".to_string(),
            CallbackAction::EditSetting(SettingKey::MaxPagesFree),
        ),
        (
            "✏️ Лимит книг в день (без подписки)".to_string(),
            CallbackAction::EditSetting(SettingKey::BooksPerDayFree),
        ),
        (
            "✏️ Лимит книг в день (с подпиской)".to_string(),
            CallbackAction::EditSetting(SettingKey::BooksPerDaySubscribed),
        ),
        ("🔒 Проверка подписки: Вкл/Выкл".to_string(), CallbackAction::ToggleBookCheck),
        ("📜 Информация о режиме".to_string(), CallbackAction::BookModeInfo),
        ("🔙 Назад".to_string(), CallbackAction::Modes),
    ]);
    Screen::new("Выберите действие:", keyboard)
}

pub fn chat_settings() -> Screen {
    let keyboard = keyboards::column([
        (
            "⏳ Изменить лимит часов".to_string(),
            CallbackAction::EditSetting(SettingKey::ChatCooldownHours),
        ),
        (
            "✏️ Лимит сообщений (без подписки)".to_string(),
            CallbackAction::EditSetting(SettingKey::ChatMessageLimit),
        ),
        ("🔒 Проверка подписки: Вкл/Выкл".to_string(), CallbackAction::ToggleChatCheck),
        ("📜 Информация о режиме".to_string(), CallbackAction::ChatModeInfo),
        ("🔙 Назад".to_string(), CallbackAction::Modes),
    ]);
    Screen::new("Выберите действие:", keyboard)
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "✅ Включена" } else { "❌ Выключена" }
}

pub fn book_mode_info(settings: &Settings) -> Screen {
    Screen::new(
        format!(
            "ℹ️ <b>Информация о режиме \"Поиск книг\"</b>\n\n\
             💬 <b>Проверка подписки:</b> {}\n\
             💬 <b>Лимит книг в день (без подписки):</b> {}\n\
             💬 <b>Лимит книг в день (с подпиской):</b> {}\n\
             💬 <b>Ограничение на макс. кол-во стрн. (без подписки):</b> {}",
            on_off(settings.book_subscription_check),
            settings.books_per_day_free,
            settings.books_per_day_subscribed,
            settings.max_pages_free
        ),
        keyboards::back(CallbackAction::BookSettings),
    )
}

pub fn chat_mode_info(settings: &Settings) -> Screen {
    Screen::new(
        format!(
            "ℹ️ <b>Информация о режиме \"Чат с ИИ\"</b>\n\n\
             📜 <b>Проверка подписки:</b> {}\n\
             💬 <b>Лимит сообщений без подписки:</b> {}\n\
             ⏳ <b>Время ожидания после исчерпания лимита:</b> {} часов",
            on_off(settings.chat_subscription_check),
            settings.chat_message_limit,
            settings.chat_cooldown_hours
        ),
        keyboards::back(CallbackAction::ChatSettings),
    )
}

pub fn check_toggled(enabled: bool, back: CallbackAction) -> Screen {
    let text =
        if enabled { "✅ Проверка подписки включена." } else { "❌ Проверка подписки выключена." };
    Screen::new(text, keyboards::back(back))
}

/// Menu the setting is edited from.
fn settings_menu(key: SettingKey) -> CallbackAction {
    match key {
        SettingKey::ChatMessageLimit | SettingKey::ChatCooldownHours => CallbackAction::ChatSettings,
        SettingKey::BooksPerDayFree
        | SettingKey::BooksPerDaySubscribed
        | SettingKey::MaxPagesFree => CallbackAction::BookSettings,
    }
}

pub fn setting_prompt(key: SettingKey, current: u32) -> Screen {
    Screen::new(
        format!("✏️ {}\nТекущее значение: {current}\n\nВведите новое значение:", key.label()),
        keyboards::back(settings_menu(key)),
    )
}

pub fn setting_updated(key: SettingKey, value: u32) -> Screen {
    Screen::new(
        format!("✅ {} изменено на {value}", key.label()),
        keyboards::back(settings_menu(key)),
    )
}

pub fn setting_invalid(key: SettingKey) -> Screen {
    let text = if key.max_value() == u32::MAX {
        format!("Введите корректное число не меньше {}", key.min_value())
    } else {
        format!("Введите корректное число от {} до {}", key.min_value(), key.max_value())
    };
    Screen::plain(text)
}

pub fn manage_plans() -> Screen {
    let keyboard = keyboards::column([
        ("➕ Добавить подписку".to_string(), CallbackAction::AddPlan),
        ("❌ Удалить подписку".to_string(), CallbackAction::RemovePlanList),
        ("🎁 Подарить подписку".to_string(), CallbackAction::GiftPlanList),
        ("🔙 Назад".to_string(), CallbackAction::AdminPanel),
    ]);
    Screen::new("Выберите действие:", keyboard)
}

pub fn plan_name_prompt() -> Screen {
    Screen::new(
        "Введите название подписки 📛✨.\n\
         Укажите его с подходящим смайликом, который будет характеризовать эту подписку! 🌟\n\
         Пример: 📚 Подписка_книги",
        keyboards::back(CallbackAction::ManagePlans),
    )
}

pub fn plan_exists(name: &str) -> Screen {
    Screen::plain(format!(
        "Подписка с именем '{}' уже существует. Пожалуйста, введите другое название.",
        html::escape(name)
    ))
}

pub fn plan_price_prompt() -> Screen {
    Screen::new("Введите цену подписки в месяц (больше 0):", keyboards::back(CallbackAction::ManagePlans))
}

pub fn plan_price_invalid() -> Screen {
    Screen::plain("Введите корректную цену подписки (целое число больше 0).")
}

pub fn plan_added(name: &str, price: i64) -> Screen {
    Screen::new(
        format!("Подписка '{}' добавлена с ценой {price} руб.", html::escape(name)),
        keyboards::back(CallbackAction::ManagePlans),
    )
}

fn plan_buttons<F>(plans: &[PlanEntity], action: F) -> Vec<Vec<InlineKeyboardButton>>
where
    F: Fn(i64) -> CallbackAction,
{
    plans.iter().map(|plan| vec![button(plan.name.clone(), action(plan.id))]).collect()
}

/// `removed` names the plan deleted by the previous click.
pub fn remove_plan_list(plans: &[PlanEntity], removed: Option<&str>) -> Screen {
    let header = removed
        .map(|name| format!("Подписка '{}' была удалена.\n", html::escape(name)))
        .unwrap_or_default();
    if plans.is_empty() {
        return Screen::new(
            format!("{header}Нет доступных подписок для удаления."),
            keyboards::back(CallbackAction::ManagePlans),
        );
    }

    let mut rows = plan_buttons(plans, CallbackAction::RemovePlan);
    rows.push(vec![button("🔙 Отмена", CallbackAction::ManagePlans)]);
    Screen::new(format!("{header}Выберите подписку для удаления:"), InlineKeyboardMarkup::new(rows))
}

pub fn gift_plan_list(plans: &[PlanEntity]) -> Screen {
    if plans.is_empty() {
        return Screen::new(
            "Нет доступных подписок для подарка. 😞",
            keyboards::back(CallbackAction::ManagePlans),
        );
    }

    let mut rows = plan_buttons(plans, CallbackAction::GiftPlan);
    rows.push(vec![button("🔙 Отмена", CallbackAction::ManagePlans)]);
    Screen::new("Выберите подписку, которую хотите подарить:", InlineKeyboardMarkup::new(rows))
}

pub fn gift_recipient_prompt(plan_name: &str) -> Screen {
    Screen::new(
        format!(
            "🎁 Подписка: {}\nВведите ID пользователя, которому хотите подарить подписку:",
            html::escape(plan_name)
        ),
        keyboards::back(CallbackAction::GiftPlanList),
    )
}

pub fn gift_recipient_invalid() -> Screen {
    Screen::plain("Введите корректный ID пользователя.")
}

pub fn gift_recipient_missing(recipient: ChatId) -> Screen {
    Screen::plain(format!("Пользователь с ID {recipient} не найден."))
}

pub fn gift_days_prompt() -> Screen {
    Screen::new("Введите количество дней подписки:", keyboards::back(CallbackAction::GiftPlanList))
}

pub fn gift_days_invalid() -> Screen {
    Screen::plain("Введите корректное количество дней для подписки (больше 0).")
}

pub fn gift_already_subscribed(until: NaiveDate) -> Screen {
    Screen::new(
        format!(
            "⚠️ У пользователя уже есть активная подписка до {}.\n\n\
             Вы не можете подарить новую подписку, пока не истечёт текущая.",
            format_date(until)
        ),
        keyboards::back(CallbackAction::ManagePlans),
    )
}

pub fn gift_done(plan_name: &str, recipient: ChatId, end_date: NaiveDate) -> Screen {
    Screen::new(
        format!(
            "🎁 Подписка '{}' подарена пользователю с ID {recipient}. Подписка активна до {}.",
            html::escape(plan_name),
            format_date(end_date)
        ),
        keyboards::back(CallbackAction::ManagePlans),
    )
}

pub fn gift_received(plan_name: &str, end_date: NaiveDate) -> Screen {
    Screen::new(
        format!(
            "🎁 Вам подарена подписка '{}'!\n📅 Действует до {}.",
            html::escape(plan_name),
            format_date(end_date)
        ),
        BACK_TO_MENU.clone(),
    )
}
