pub mod audio_processor;
