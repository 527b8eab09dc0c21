pub mod weight_export;
