//! # Car Price Telegram Bot
//!
//! A Telegram bot that lists car and mobile-phone prices, estimates a used
//! car's price from its age, mileage and body condition, and gives admins an
//! inline-keyboard panel to manage catalogs, menus and broadcasts.

pub mod backup;
pub mod bot;
pub mod catalog;
pub mod config;
pub mod conversation;
pub mod dialogue;
pub mod estimator;
pub mod localization;
pub mod menu;
pub mod store;
