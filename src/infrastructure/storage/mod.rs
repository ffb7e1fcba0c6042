//! Storage account clients

mod client;

pub use client::{
    add_blob_service_client, add_queue_service_client, StorageClient, StorageCredential,
    StorageDescriptor, StorageService,
};
