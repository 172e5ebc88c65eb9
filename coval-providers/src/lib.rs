pub mod coval;
pub mod openai_compatible;
pub mod parse;
pub mod request;
pub mod runtime;
pub mod signed_url;
pub mod twilio;
pub mod vapi;
