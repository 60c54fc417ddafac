//! modwatch: automated moderation signals for a content publishing platform.
//!
//! Every create, edit, and publish of user content is scored against a set of
//! detection rules (spam text, suspicious links, posting floods, mass account
//! activity). Results are persisted as moderation signals for the review queue,
//! and sufficiently severe content can be hidden automatically under a
//! configurable policy, with a full audit trail.

pub mod config;
pub mod db;
pub mod moderation;
pub mod orm;
