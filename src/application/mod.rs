pub mod documents;
pub mod verification;
pub mod workflow;
