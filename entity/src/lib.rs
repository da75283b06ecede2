pub mod app_user;
pub mod deletion_request;
pub mod department;
pub mod employee;
pub mod instruction;
pub mod position;
pub mod training_program;
pub mod training_record;
pub mod user_role;
pub mod user_secret;
