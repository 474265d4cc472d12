use serde::{Deserialize, Serialize};

use super::plan::Addon;

/// Language the book and the bot's progress messages are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BookLanguage {
    /// Russian.
    #[default]
    #[serde(rename = "ru")]
    Russian,
    /// English.
    #[serde(rename = "en")]
    English,
}

impl BookLanguage {
    /// Asks for the exact title and a split into seven parts.
    pub fn outline_prompt(self, title: &str) -> String {
        match self {
            BookLanguage::Russian => format!(
                "Раздели книгу под названием \"{title}\" обязательно ровно на 7 частей. \
                 Если книга существует, раздели её на 7 подробных частей в формате \"1. ...\" \
                 и укажи правильное название в кавычках. \
                 Если книга не существует, напиши, что книга не существует."
            ),
            BookLanguage::English => format!(
                "Split the book titled \"{title}\" into exactly 7 parts. \
                 If the book exists, split it into 7 detailed parts formatted as \"1. ...\" \
                 and give its exact title in quotes. \
                 If the book does not exist, say that the book does not exist."
            ),
        }
    }

    /// Asks for one sub-part of a part.
    pub fn subpart_prompt(
        self,
        title: &str,
        page_count: u32,
        part: &str,
        subpart: u32,
        subparts: u32,
        words: u32,
    ) -> String {
        match self {
            BookLanguage::Russian => format!(
                "Книга '{title}' содержит {page_count} страниц. \
                 Мы сейчас рассматриваем часть {part}, подчасть {subpart}/{subparts}. \
                 В этой подчасти должно быть {words} слов. \
                 Учитывая это, напиши о содержании данной подчасти книги. \
                 Не пиши слова \"часть\" и \"подчасть\" в тексте."
            ),
            BookLanguage::English => format!(
                "Book '{title}' contains {page_count} pages. \
                 We are now considering part {part}, subpart {subpart}/{subparts}. \
                 This subpart should be {words} words long. \
                 With this in mind, write about the content of this sub-part of the book. \
                 Do not write the words \"part\" and \"subpart\" in the text."
            ),
        }
    }

    /// Prompt for one addon call. `page` is `Some((i, n))` when the addon is
    /// generated in several calls.
    pub fn addon_prompt(
        self,
        addon: Addon,
        title: &str,
        words: u32,
        page: Option<(usize, usize)>,
    ) -> String {
        let subject = match (self, addon) {
            (BookLanguage::Russian, Addon::Analysis) => {
                format!("Напиши подробный анализ книги {title} и разбор её ключевых идей.")
            }
            (BookLanguage::Russian, Addon::Quotes) => {
                format!("Напиши обширный подбор цитат из книги {title}.")
            }
            (BookLanguage::Russian, Addon::Biography) => {
                format!("Напиши небольшую биографию автора книги {title}.")
            }
            (BookLanguage::Russian, Addon::Critique) => {
                format!("Напиши о критике книги {title}.")
            }
            (BookLanguage::English, Addon::Analysis) => format!(
                "Write a detailed analysis of the book {title} and an analysis of its key ideas."
            ),
            (BookLanguage::English, Addon::Quotes) => {
                format!("Write an extensive selection of quotes from the book {title}.")
            }
            (BookLanguage::English, Addon::Biography) => {
                format!("Write a short biography of the author of the book {title}.")
            }
            (BookLanguage::English, Addon::Critique) => {
                format!("Write about the criticism of the book {title}.")
            }
        };

        let position = match (self, page) {
            (_, None) => String::new(),
            (BookLanguage::Russian, Some((i, n))) => format!(" Мы сейчас рассматриваем часть {i}/{n}."),
            (BookLanguage::English, Some((i, n))) => format!(" We are now considering part {i}/{n}."),
        };

        let length = match self {
            BookLanguage::Russian => format!(" В тексте должно быть {words} слов."),
            BookLanguage::English => format!(" The text should contain {words} words."),
        };

        format!("{subject}{position}{length}")
    }

    /// First progress message.
    pub fn progress_start(self) -> &'static str {
        match self {
            BookLanguage::Russian => "⏳ Начинаем обработку...",
            BookLanguage::English => "⏳ Let's start processing...",
        }
    }

    /// Progress while writing the main text.
    pub fn progress_part(self, part: usize, subpart: u32, subparts: u32) -> String {
        match self {
            BookLanguage::Russian => {
                format!("⏳ Обрабатываем часть {part}/7, подчасть {subpart}/{subparts}")
            }
            BookLanguage::English => {
                format!("⏳ Processing part {part}/7, subpart {subpart}/{subparts}")
            }
        }
    }

    /// Progress while writing the extras.
    pub fn progress_extra(self, current: usize, total: usize) -> String {
        match self {
            BookLanguage::Russian => format!("⏳ Обрабатываем дополнение {current}/{total}"),
            BookLanguage::English => format!("⏳ Processing extra {current}/{total}"),
        }
    }
}
