pub mod household;
pub mod household_member;
pub mod job_registry_item;
pub mod subscription;
pub mod subscription_history;
pub mod user;
