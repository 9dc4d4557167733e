//! # Route Modules
//!
//! | Module | Paths | Access |
//! |--------|-------|--------|
//! | [`products`] | `/api/products`, `/api/products/{id}` | `USER` or `ADMIN`; create needs `ADMIN` |
//! | [`login`] | `/oauth2/authorization/*`, `/login/oauth2/code/*` | public |
//! | [`account`] | `/me`, `/logout` | signed in |

pub mod account;
pub mod login;
pub mod products;
