//! API handlers.

pub mod auth;

pub use auth::{
    change_password, confirm, login, logout, logout_all, me, recover, refresh, register, AppState,
};
