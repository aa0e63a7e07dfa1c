pub mod db;

pub use db::{
    batch_display_name, create_db, delete_file, get_all_transactions, get_imported_files,
    get_transactions_by_file_id, save_transactions, DbPool, StorageError,
};
