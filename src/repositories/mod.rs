pub mod role_repository;
pub mod user_repository;

pub use role_repository::{RoleRepository, SqliteRoleRepository};
pub use user_repository::{
    RepositoryError, RepositoryResult, SqliteUserRepository, UniqueField, UserRepository,
};
