//! Client core for the Unsent note canvas.
//!
//! Everything a browser host needs except the DOM: turning pointer, wheel and
//! keyboard events into view changes and grid clicks, throttling posts,
//! remembering reports, keeping the live note collection in sync, and
//! talking to the note service. The crate builds natively for tests and to
//! `wasm32` for the page, where [`storage::BrowserStorage`],
//! [`clock::SystemClock`] and the [`realtime`] socket bind to browser APIs.
//!
//! The note model, validation rules and change-feed wire format are shared
//! with the server.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`controller`] | Composition root: form, submit, report, feed wiring, teardown |
//! | [`engine`] | Pointer/wheel/keyboard handling that emits [`engine::Action`]s |
//! | [`camera`] | Zoom/offset state and screen ↔ grid conversion |
//! | [`input`] | Modifier keys and the press/pan/click gesture |
//! | [`feed`] | Live note collection and change-feed subscriptions |
//! | [`realtime`] | WebSocket change feed with reconnect and connection status |
//! | [`ticker`] | Periodic callbacks for the cooldown countdown |
//! | [`cooldown`] | Persistent post cooldown and hourly rate limit |
//! | [`reports`] | Notes this client already reported |
//! | [`validation`] | Field validation and sanitization |
//! | [`moderation`] | Pluggable spam/abuse checks |
//! | `patterns` | Compiled regexes shared by validation and moderation |
//! | [`store`] | The note service contract |
//! | [`net`] | HTTP implementation of the note service contract |
//! | [`note`] | Note, draft and grid-area types |
//! | [`storage`] | Key/value persistence (`localStorage` or memory) |
//! | [`clock`] | Wall clock abstraction |
//! | [`consts`] | Shared numeric constants |

pub mod camera;
pub mod clock;
pub mod consts;
pub mod controller;
pub mod cooldown;
pub mod engine;
pub mod feed;
pub mod input;
pub mod moderation;
pub mod net;
pub mod note;
mod patterns;
pub mod realtime;
pub mod reports;
pub mod storage;
pub mod store;
pub mod ticker;
pub mod validation;
