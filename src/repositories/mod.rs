pub mod game_repository;
pub mod price_history_repository;

// Re-export all repositories for convenient access
pub use game_repository::GameRepository;
pub use price_history_repository::PriceHistoryRepository;
