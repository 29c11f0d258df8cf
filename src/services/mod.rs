pub mod patch_service;
