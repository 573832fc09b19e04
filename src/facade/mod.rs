mod manager;

pub use manager::EntityManager;
