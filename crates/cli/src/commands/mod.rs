pub mod doctor;
pub mod serve;
