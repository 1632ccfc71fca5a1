//! Copy, images and menus shown by the funnel
//!
//! Texts are fixed; links to the private chat, the trainer and the recipes group
//! come from configuration.

use serde::Deserialize;
use teloxide::utils::html::escape;

use super::response::{Menu, Response};
use super::types::{Choice, Tariff};

const GREETING_PHOTO: &str = "https://i.ibb.co/pr4CxkkM/1.jpg";
const TARIFFS_PHOTO: &str = "https://i.ibb.co/F9mRf4f/Tarif.jpg";
const REVIEW_PHOTOS: [&str; 9] = [
    "https://i.ibb.co/N6yx0vQ7/Otziv-foto.jpg",
    "https://i.ibb.co/qLgkfHqk/Otziv-foto-2.jpg",
    "https://i.ibb.co/zWxK49Xb/Otziv-foto-1.jpg",
    "https://i.ibb.co/HD66d5vd/Otziv-1.jpg",
    "https://i.ibb.co/mVrGJPWs/Otziv-2.jpg",
    "https://i.ibb.co/G3B9Fpt3/Otziv-3.jpg",
    "https://i.ibb.co/xSDjZs9F/Otziv-4.jpg",
    "https://i.ibb.co/394skJ6t/Otziv-5.jpg",
    "https://i.ibb.co/ccRXCJ6p/Otziv.jpg",
];

const GREETING: &str = "«POLINAFIT» — место, где ты обретёшь новую версию себя! 💫\n\n\
Проект — это не краткосрочный марафон. Это про индивидуальный подход к каждой участнице!\n\n\
Я даю рекомендации по питанию после того, как подробно изучу твой случай: \
образ жизни, активность, травмы, цели.\n\n\
Именно такой подход поможет тебе достичь результата — без стресса и откатов.\n\n\
Готова начать? 👇";

const PROJECT: &str = "Проект POLINAFIT — это комплексная работа, где важно всё:\n\n\
• Режим питания\n\
• Тренировки\n\
• Поддержка от участниц и лично от меня\n\n\
Это место, где я доведу тебя за ручку до цели и не дам откатиться назад — \
даже при отпуске, стрессе, болезни или травме.\n\n\
Что входит в проект:\n\n\
🤍 <b>Тренировки</b> для любого уровня: дома или в зале\n\
— лёгкие (для новичков)\n\
— средние (для продолжающих)\n\
— интенсивные (для продвинутых)\n\n\
🤍 <b>Питание</b>: индивидуальный расчёт КБЖУ + сборники завтраков/обедов/ужинов\n\n\
🤍 <b>Индивидуальная работа</b>: проверка отчётов 2 раза в неделю по питанию, \
2 раза в месяц — по форме\n\n\
🤍 <b>Любая цель</b>: снижение, набор веса\n\n\
🤍 <b>Закрытый чат</b> с участницами: поддержка, рецепты, эмоции, вопросы";

const EXPLORE_PROMPT: &str = "Выбери, что хочешь узнать:";

const TARIFFS: &str = "В проекте действует подписка, которая открывает тебе доступ к:\n\n\
• Анализу состояния\n\
• Индивидуальному расчёту КБЖУ и плану тренировок\n\
• Тренировкам на любую цель\n\
• Видео с техникой упражнений\n\
• Еженедельному контролю\n\
• Закрытому чату\n\
• Сборнику бюджетных рецептов\n\
• Гайду по продуктам и путеводителю по питанию\n\
• FAQ-видео по питанию и тренировкам\n\n\
Выбери тариф:";

const REVIEWS: &str = "Ты только посмотри на отзывы моих девочек 🥹 \
А это всего один месяц работы! ВАУ!!!\n\n\
Хочешь тоже так? Жми 👇";

const EMAIL_PROMPT: &str = "Пожалуйста, укажи свой email — я отправлю тебе чек после оплаты:";
const EMAIL_INVALID: &str = "Пожалуйста, введите корректный email (например: polina@mail.ru)";
const CANCELLED: &str = "Хорошо, вернёмся к выбору. Выбери, что хочешь узнать:";
const FALLBACK: &str = "Пожалуйста, используй кнопки меню.";

const NAME_PROMPT: &str = "Спасибо! Давай познакомимся. Как тебя зовут?";
const NAME_INVALID: &str = "Напиши, пожалуйста, своё имя буквами 🙂";
const HEIGHT_PROMPT: &str = "Укажи свой рост в сантиметрах (например: 168):";
const WEIGHT_PROMPT: &str = "Теперь вес в килограммах (например: 62,5):";
const MEASURE_INVALID: &str = "Не получилось распознать число. Попробуй ещё раз, только цифры:";

/// External links sent after a successful sign-up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Links {
    pub private_chat: String,
    pub trainer: String,
    pub recipes_group: String,
}

impl Default for Links {
    fn default() -> Self {
        Self {
            private_chat: "https://t.me/plans_channel".to_string(),
            trainer: "@your_trainer".to_string(),
            recipes_group: "https://t.me/recipes_group".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Content {
    links: Links,
}

impl Content {
    pub fn new(links: Links) -> Self {
        Self { links }
    }

    pub fn start_menu() -> Menu {
        Menu::single(Choice::Join)
    }

    pub fn explore_menu() -> Menu {
        Menu::new(vec![vec![Choice::Tariffs, Choice::Reviews]])
    }

    pub fn tariff_menu() -> Menu {
        Menu::new(vec![
            vec![
                Choice::Tariff(Tariff::FifteenDays),
                Choice::Tariff(Tariff::OneMonth),
            ],
            vec![Choice::Tariff(Tariff::ThreeMonths)],
            vec![Choice::Back],
        ])
    }

    pub fn greeting(&self) -> Response {
        Response::text(GREETING)
            .with_photo(GREETING_PHOTO)
            .with_menu(Self::start_menu())
    }

    pub fn project(&self) -> Response {
        Response::text(format!("{PROJECT}\n\n{EXPLORE_PROMPT}"))
            .with_menu(Self::explore_menu())
            .html()
    }

    pub fn tariffs(&self) -> Response {
        Response::text(TARIFFS)
            .with_photo(TARIFFS_PHOTO)
            .with_menu(Self::tariff_menu())
    }

    pub fn reviews(&self) -> Response {
        Response::text(REVIEWS)
            .with_photos(REVIEW_PHOTOS)
            .with_menu(Menu::single(Choice::Tariffs))
    }

    pub fn explore(&self) -> Response {
        Response::text(EXPLORE_PROMPT).with_menu(Self::explore_menu())
    }

    pub fn email_prompt(&self) -> Response {
        Response::text(EMAIL_PROMPT).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn invalid_email(&self) -> Response {
        Response::text(EMAIL_INVALID).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn cancelled(&self) -> Response {
        Response::text(CANCELLED).with_menu(Self::explore_menu())
    }

    pub fn confirmation(&self, tariff: Tariff) -> Response {
        let private_chat = escape(&self.links.private_chat);
        let trainer = escape(&self.links.trainer);
        let text = format!(
            "Поздравляю! Подписка успешно оформлена на <b>{duration}</b> 🥳\n\n\
             Ура! Ты в проекте! Прежде чем начать, давай обсудим организационные моменты:\n\n\
             1️⃣ Вступи в закрытый чат: {private_chat}\n\
             2️⃣ Активируй чат со мной: {trainer}\n\n\
             После этого нажми кнопку ниже:",
            duration = tariff.duration(),
        );
        Response::text(text)
            .with_menu(Menu::single(Choice::Continue))
            .html()
    }

    pub fn onboarding(&self) -> Response {
        let group = escape(&self.links.recipes_group);
        let text = format!(
            "Дорогая, я рада приветствовать тебя в проекте POLINAFIT! 🎉\n\n\
             Для начала тебе нужно:\n\
             1. Перейти в закрытый канал: {group}\n\
             2. Нажать на закреплённое сообщение «НАВИГАЦИЯ»\n\
             3. Выбрать «АНКЕТА ДЛЯ ВСТУПЛЕНИЯ В ПРОЕКТ»\n\
             4. Скопировать анкету, вставить сюда и заполнить\n\n\
             ❗ Изучай материал <b>последовательно — сверху вниз</b>, чтобы ничего не пропустить.\n\n\
             Вступай в закрытую группу со всей информацией 🫶🏻\n\
             👉 {group}"
        );
        Response::text(text).html()
    }

    pub fn fallback(&self) -> Response {
        Response::text(FALLBACK).with_menu(Self::start_menu())
    }

    pub fn payment_prompt(&self, tariff: Tariff) -> Response {
        let text = format!(
            "Тариф «{label}» — {price} ₽.\n\n\
             После оплаты нажми кнопку «✅ Оплатил», и мы продолжим.",
            label = tariff.label(),
            price = tariff.price_rub(),
        );
        Response::text(text).with_menu(Menu::new(vec![vec![Choice::Paid], vec![Choice::Cancel]]))
    }

    pub fn name_prompt(&self) -> Response {
        Response::text(NAME_PROMPT).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn invalid_name(&self) -> Response {
        Response::text(NAME_INVALID).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn height_prompt(&self) -> Response {
        Response::text(HEIGHT_PROMPT).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn weight_prompt(&self) -> Response {
        Response::text(WEIGHT_PROMPT).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn invalid_measure(&self) -> Response {
        Response::text(MEASURE_INVALID).with_menu(Menu::single(Choice::Cancel))
    }

    pub fn profile_done(&self, name: &str, calories: i64) -> Response {
        let name = escape(name);
        let text = format!(
            "{name}, спасибо! Твоя ориентировочная норма: <b>{calories} ккал</b> в день.\n\n\
             Дальше — организационные моменты. Нажми кнопку ниже:"
        );
        Response::text(text)
            .with_menu(Menu::single(Choice::Continue))
            .html()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_has_photo_and_join_button() {
        let response = Content::default().greeting();
        assert_eq!(response.photos, vec![GREETING_PHOTO.to_string()]);
        assert!(response.menu.unwrap().contains(&Choice::Join));
    }

    #[test]
    fn reviews_carry_all_photos() {
        let response = Content::default().reviews();
        assert_eq!(response.photos.len(), 9);
        assert_eq!(response.menu, Some(Menu::single(Choice::Tariffs)));
    }

    #[test]
    fn tariff_menu_lists_every_tariff_and_back() {
        let menu = Content::tariff_menu();
        for tariff in Tariff::ALL {
            assert!(menu.contains(&Choice::Tariff(tariff)));
        }
        assert!(menu.contains(&Choice::Back));
    }

    #[test]
    fn confirmation_substitutes_duration_and_links() {
        let content = Content::new(Links {
            private_chat: "https://t.me/private".to_string(),
            trainer: "@coach".to_string(),
            recipes_group: "https://t.me/group".to_string(),
        });
        let response = content.confirmation(Tariff::ThreeMonths);

        assert!(response.text.contains("<b>3 месяца</b>"));
        assert!(response.text.contains("https://t.me/private"));
        assert!(response.text.contains("@coach"));
        assert_eq!(response.menu, Some(Menu::single(Choice::Continue)));
    }

    #[test]
    fn onboarding_mentions_group_link() {
        let response = Content::default().onboarding();
        assert!(response.text.contains("https://t.me/recipes_group"));
    }

    #[test]
    fn user_name_is_escaped_in_profile_summary() {
        let response = Content::default().profile_done("Аня <3 & co", 150);
        assert!(response.text.contains("Аня &lt;3 &amp; co"));
        assert!(!response.text.contains("<3"));
        assert!(response.text.contains("<b>150 ккал</b>"));
    }

    #[test]
    fn configured_links_are_escaped() {
        let content = Content::new(Links {
            private_chat: "https://t.me/+join?a=1&b=2".to_string(),
            trainer: "<coach>".to_string(),
            recipes_group: "https://t.me/group?x=1&y=2".to_string(),
        });

        let confirmation = content.confirmation(Tariff::OneMonth).text;
        assert!(confirmation.contains("https://t.me/+join?a=1&amp;b=2"));
        assert!(confirmation.contains("&lt;coach&gt;"));
        assert!(!confirmation.contains("<coach>"));

        let onboarding = content.onboarding().text;
        assert!(onboarding.contains("https://t.me/group?x=1&amp;y=2"));
    }

    #[test]
    fn payment_prompt_shows_price() {
        let response = Content::default().payment_prompt(Tariff::FifteenDays);
        assert!(response.text.contains("1990"));
        assert!(response.menu.unwrap().contains(&Choice::Paid));
    }
}
