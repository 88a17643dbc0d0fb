//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod campaign_message_model;
pub mod campaign_model;
pub mod contact_model;
pub mod gateway_model;
