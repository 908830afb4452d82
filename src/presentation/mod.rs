pub mod blocks;
pub mod i18n;
pub mod rich_text;
pub mod views;
