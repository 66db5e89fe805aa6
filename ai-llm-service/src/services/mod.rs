pub mod hf_inference_service;
