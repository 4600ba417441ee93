// Application layer - builder session state and its collaborators
pub mod auto_save;
pub mod concurrency;
pub mod dashboard_api;
pub mod error;
pub mod history;
pub mod layout;
pub mod query_cache;
pub mod session;
pub mod shortcuts;
pub mod wizard;

#[cfg(test)]
pub mod test_support;
