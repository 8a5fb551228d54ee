use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::auth::{AccessError, Credentials};
use crate::ingest::distinct_blocks;
use crate::models::{AggregationResult, RowRecord, Upload};
use crate::report::Report;

pub const HELP_TEXT: &str = "\
How to Use This Tool

1. Upload your Excel file.
2. Calculate all results to view all student statistics.
3. Select a Block to generate block-specific results.
4. View the charts & tables for full analytics.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("log in before using the results view")]
    NotAuthenticated,
    #[error("block '{0}' does not appear in the uploaded file")]
    UnknownBlock(String),
}

/// State behind the login form and the results view.
///
/// Every field changes only through one of the action methods below.
#[derive(Debug)]
pub struct ViewState {
    credentials: Credentials,
    pub authenticated: bool,
    pub login_error: Option<AccessError>,
    pub upload: Option<Upload>,
    pub blocks: Vec<String>,
    pub selected_block: Option<String>,
    pub results: Option<AggregationResult>,
    pub block_results: Option<AggregationResult>,
    pub show_help: bool,
}

impl ViewState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            authenticated: false,
            login_error: None,
            upload: None,
            blocks: Vec::new(),
            selected_block: None,
            results: None,
            block_results: None,
            show_help: false,
        }
    }

    pub fn login(&mut self, id: &str, password: &str) -> Result<(), SessionError> {
        match self.credentials.verify(id, password) {
            Ok(()) => {
                info!(id, "login accepted");
                self.authenticated = true;
                self.login_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(id, "login rejected");
                self.login_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Replaces the current upload; earlier results and block choice are dropped.
    pub fn upload(&mut self, upload: Upload) -> Result<&[String], SessionError> {
        self.require_login()?;
        self.blocks = distinct_blocks(&upload.rows);
        self.selected_block = None;
        self.results = None;
        self.block_results = None;
        self.upload = Some(upload);
        Ok(&self.blocks)
    }

    pub fn rows(&self) -> &[RowRecord] {
        self.upload
            .as_ref()
            .map(|upload| upload.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn file_name(&self) -> &str {
        self.upload
            .as_ref()
            .map(|upload| upload.file_name.as_str())
            .unwrap_or("(no file)")
    }

    pub fn calculate_all(&mut self) -> Result<&AggregationResult, SessionError> {
        self.require_login()?;
        let result = aggregate(self.rows(), None);
        Ok(self.results.insert(result))
    }

    /// An empty label clears the selection.
    pub fn select_block(&mut self, block: &str) -> Result<(), SessionError> {
        self.require_login()?;
        if block.is_empty() {
            self.selected_block = None;
            return Ok(());
        }
        if !self.blocks.iter().any(|known| known == block) {
            return Err(SessionError::UnknownBlock(block.to_string()));
        }
        self.selected_block = Some(block.to_string());
        Ok(())
    }

    /// With no block selected this covers every row.
    pub fn calculate_block(&mut self) -> Result<&AggregationResult, SessionError> {
        self.require_login()?;
        let result = aggregate(self.rows(), self.selected_block.as_deref());
        Ok(self.block_results.insert(result))
    }

    pub fn open_help(&mut self) -> &'static str {
        self.show_help = true;
        HELP_TEXT
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    pub fn report(&self) -> Report<'_> {
        let report = Report::new(
            self.file_name(),
            self.results.as_ref(),
            self.block_results.as_ref(),
        );
        match &self.upload {
            Some(upload) => report.loaded_at(upload.loaded_at),
            None => report,
        }
    }

    fn require_login(&self) -> Result<(), SessionError> {
        if self.authenticated {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated)
        }
    }
}
