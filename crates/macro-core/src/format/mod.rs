//! On-disk macro representation.
//!
//! Macro files are pretty-printed JSON:
//!
//! ```json
//! {
//!   "events": [
//!     { "type": "mouse_move",  "timestamp": 0.0,  "x": 10, "y": 10 },
//!     { "type": "mouse_click", "timestamp": 0.5,  "x": 10, "y": 10, "button": "left", "pressed": true },
//!     { "type": "key_press",   "timestamp": 0.75, "key": "a", "vkCode": 65 }
//!   ]
//! }
//! ```
//!
//! Fields that do not apply to a record's `type` are omitted rather than
//! written as `null`.

pub mod macro_file;
