pub mod document_repository;

pub use document_repository::{
    DocumentPatch, DocumentRecord, DocumentRepository, NewDocument, SeaOrmDocumentRepository,
};
