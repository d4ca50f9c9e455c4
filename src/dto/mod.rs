pub mod progress_dto;
