pub mod services;

pub use services::{CreateReport, TopicListing, TopicService};
