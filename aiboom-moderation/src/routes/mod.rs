pub mod health;
pub mod live;
pub mod posts;
pub mod reports;
pub mod resolve;
pub mod votes;
