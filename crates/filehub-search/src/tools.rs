//! MCP server exposing the filehub tools: list_storages, search_files,
//! read_file, list_files.
//!
//! Tool failures are reported inside the result (`isError`), never as
//! protocol errors, so a client always gets a readable "Failed to ..." text.

use std::sync::Arc;

use filehub_storage_core::StorageError;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Serialize;
use tracing::{info, warn};

use crate::federator::{FederatedQuery, SearchFederator, MAX_RESULTS_CEILING};
use crate::models::{ListFilesRequest, ReadFileRequest, SearchFilesRequest};
use crate::registry::StorageRegistry;
use crate::render::{
    self, DirectoryListing, FileContent, ListedFile, RankedMatch, SearchReport, StorageList,
    StorageSummary,
};

/// Markdown text plus the same data as structured content.
fn success<T: Serialize>(text: String, payload: &T) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    match serde_json::to_value(payload) {
        Ok(value) => result.structured_content = Some(value),
        Err(e) => warn!("Failed to serialize structured content: {}", e),
    }
    result
}

fn failure(verb: &str, err: &StorageError) -> CallToolResult {
    warn!("Failed to {}: {}", verb, err);
    CallToolResult::error(vec![Content::text(format!("Failed to {}: {}", verb, err))])
}

/// MCP server over the configured storages.
#[derive(Clone)]
pub struct FileHubMcp {
    registry: Arc<StorageRegistry>,
    federator: Arc<SearchFederator>,
    max_depth: usize,
    tool_router: ToolRouter<Self>,
}

impl FileHubMcp {
    pub fn new(registry: Arc<StorageRegistry>, parallel_search: bool, max_depth: usize) -> Self {
        Self {
            federator: Arc::new(SearchFederator::new(
                registry.clone(),
                parallel_search,
                max_depth,
            )),
            registry,
            max_depth,
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    /// Tool definitions as advertised by `tools/list`.
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn try_search_files(&self, req: SearchFilesRequest) -> Result<SearchReport, StorageError> {
        if req.query.is_empty() {
            return Err(StorageError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        let max_results = usize::try_from(req.max_results)
            .ok()
            .filter(|n| (1..=MAX_RESULTS_CEILING).contains(n))
            .ok_or_else(|| {
                StorageError::InvalidRequest(format!(
                    "max_results must be between 1 and {}, got {}",
                    MAX_RESULTS_CEILING, req.max_results
                ))
            })?;

        let query = FederatedQuery {
            query: req.query,
            storage_ids: req.storage_ids,
            file_types: req.file_types,
            include_images: req.include_images,
            max_results,
        };
        let outcome = self.federator.search(&query).await;
        info!(
            "search_files '{}': {} results",
            query.query,
            outcome.results.len()
        );

        Ok(SearchReport {
            total_results: outcome.results.len(),
            results: outcome.results.into_iter().map(RankedMatch::from).collect(),
            failed_storages: outcome.failed_storages,
            query: query.query,
        })
    }

    async fn try_read_file(&self, req: ReadFileRequest) -> Result<FileContent, StorageError> {
        let adapter = self.registry.get(&req.storage_id)?;
        let content = adapter
            .read_file_with(&req.file_path, req.extract_text)
            .await?;
        Ok(FileContent {
            size: content.chars().count(),
            storage_id: req.storage_id,
            file_path: req.file_path,
            content,
        })
    }

    async fn try_list_files(&self, req: ListFilesRequest) -> Result<DirectoryListing, StorageError> {
        let adapter = self.registry.get(&req.storage_id)?;
        let files = if req.recursive {
            adapter
                .list_files_recursive(&req.directory, self.max_depth)
                .await?
        } else {
            adapter.list_files(&req.directory).await?
        };

        Ok(DirectoryListing {
            storage_id: req.storage_id,
            directory: if req.directory.is_empty() {
                "/".to_string()
            } else {
                req.directory
            },
            total_files: files.len(),
            files: files.into_iter().map(ListedFile::from).collect(),
        })
    }
}

#[tool_router]
impl FileHubMcp {
    #[tool(
        name = "list_storages",
        description = "Returns every configured storage location (local drives, NAS, cloud storage, Android devices) with its id, type, platform, path and whether it is enabled.",
        annotations(
            title = "List Available Storages",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true
        )
    )]
    pub async fn list_storages(&self) -> Result<CallToolResult, McpError> {
        let list = StorageList {
            storages: self
                .registry
                .descriptors()
                .iter()
                .map(StorageSummary::from)
                .collect(),
        };
        Ok(success(render::storages_markdown(&list), &list))
    }

    #[tool(
        name = "search_files",
        description = "Full-text search of file contents across all enabled storages, including OCR of images. Results are ranked by the number of matching lines, with up to three matching lines as preview.",
        annotations(
            title = "Search Files Across All Storages",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = true
        )
    )]
    pub async fn search_files(
        &self,
        Parameters(req): Parameters<SearchFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.try_search_files(req).await {
            Ok(report) => success(render::search_markdown(&report), &report),
            Err(e) => failure("search files", &e),
        })
    }

    #[tool(
        name = "read_file",
        description = "Read the complete content of a file from any storage as text. Images are run through OCR unless extract_text is false.",
        annotations(
            title = "Read File Content",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true
        )
    )]
    pub async fn read_file(
        &self,
        Parameters(req): Parameters<ReadFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.try_read_file(req).await {
            Ok(file) => success(render::file_markdown(&file), &file),
            Err(e) => failure("read file", &e),
        })
    }

    #[tool(
        name = "list_files",
        description = "List files and directories in a storage location with size and modification date. Set recursive to include subdirectories.",
        annotations(
            title = "List Files in Directory",
            read_only_hint = true,
            destructive_hint = false,
            idempotent_hint = true
        )
    )]
    pub async fn list_files(
        &self,
        Parameters(req): Parameters<ListFilesRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(match self.try_list_files(req).await {
            Ok(listing) => success(render::listing_markdown(&listing), &listing),
            Err(e) => failure("list files", &e),
        })
    }
}

#[tool_handler]
impl ServerHandler for FileHubMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            "filehub searches and reads files across local drives, NAS shares, WebDAV cloud storage and Android devices. Use list_storages first, then search_files, read_file or list_files.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DriverFactory;
    use crate::testing::{descriptor, FakeOcr, MemoryDriver};
    use filehub_storage_core::{BackendDriver, StorageDescriptor};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    struct Fixture;

    impl DriverFactory for Fixture {
        fn build(&self, descriptor: &StorageDescriptor) -> Arc<dyn BackendDriver> {
            let driver = MemoryDriver::new(&descriptor.id);
            Arc::new(match descriptor.id.as_str() {
                "linux-home" => driver
                    .with_file("notes/todo.txt", "buy milk\ncall mom")
                    .with_file("photos/scan.png", "raw png bytes"),
                "nas-storage" => driver.with_file("shared/report.md", "quarterly report"),
                _ => driver,
            })
        }
    }

    fn service() -> FileHubMcp {
        let mut disabled = descriptor("macos-home");
        disabled.enabled = false;
        let registry = StorageRegistry::new(
            vec![descriptor("linux-home"), disabled, descriptor("nas-storage")],
            &Fixture,
            Arc::new(FakeOcr::new("TOTAL milk 3.50")),
            "eng",
        );
        FileHubMcp::new(Arc::new(registry), true, 8)
    }

    fn text(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text())
            .map(|t| t.text.clone())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn structured(result: &CallToolResult) -> &Value {
        result
            .structured_content
            .as_ref()
            .expect("structured content")
    }

    fn read(storage_id: &str, file_path: &str) -> Parameters<ReadFileRequest> {
        Parameters(ReadFileRequest {
            storage_id: storage_id.to_string(),
            file_path: file_path.to_string(),
            extract_text: true,
        })
    }

    fn list(storage_id: &str, directory: &str, recursive: bool) -> Parameters<ListFilesRequest> {
        Parameters(ListFilesRequest {
            storage_id: storage_id.to_string(),
            directory: directory.to_string(),
            recursive,
        })
    }

    #[test]
    fn test_tool_catalog() {
        let service = service();
        let mut tools = service.tools();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<_> = tools.iter().map(|t| t.name.to_string()).collect();
        assert_eq!(
            names,
            vec!["list_files", "list_storages", "read_file", "search_files"]
        );
        for tool in &tools {
            let annotations = tool.annotations.as_ref().expect("annotations");
            assert_eq!(annotations.read_only_hint, Some(true));
            assert_eq!(annotations.destructive_hint, Some(false));
        }
        assert!(service.get_info().capabilities.tools.is_some());
    }

    #[test]
    fn test_search_schema_carries_limits() {
        let tools = service().tools();
        let search = tools
            .iter()
            .find(|t| t.name == "search_files")
            .expect("search_files");
        let schema = Value::Object(search.input_schema.as_ref().clone());
        let max_results = &schema["properties"]["max_results"];
        assert_eq!(max_results["minimum"].as_f64(), Some(1.0));
        assert_eq!(max_results["maximum"].as_f64(), Some(100.0));
        assert_eq!(max_results["default"].as_f64(), Some(20.0));
        assert_eq!(schema["properties"]["include_images"]["default"], json!(true));
        assert_eq!(schema["required"], json!(["query"]));
    }

    #[test]
    fn test_request_defaults() {
        let req: SearchFilesRequest = serde_json::from_value(json!({"query": "milk"})).unwrap();
        assert!(req.include_images);
        assert_eq!(req.max_results, 20);

        let req: ReadFileRequest =
            serde_json::from_value(json!({"storage_id": "s", "file_path": "a.txt"})).unwrap();
        assert!(req.extract_text);

        let req: ListFilesRequest = serde_json::from_value(json!({"storage_id": "s"})).unwrap();
        assert_eq!(req.directory, "");
        assert!(!req.recursive);
    }

    #[tokio::test]
    async fn test_list_storages_includes_disabled() {
        let result = service().list_storages().await.unwrap();
        assert_eq!(result.is_error, Some(false));
        let storages = structured(&result)["storages"].as_array().unwrap();
        assert_eq!(storages.len(), 3);
        assert_eq!(storages[1]["id"], "macos-home");
        assert_eq!(storages[1]["enabled"], false);
        assert_eq!(storages[0]["type"], "local");

        let text = text(&result);
        assert!(text.starts_with("# Available Storage Locations\n\n## linux-home\n"));
        assert!(text.contains("❌ Disabled"));
    }

    #[tokio::test]
    async fn test_search_files_milk_scenario() {
        let mut req = SearchFilesRequest::new("milk");
        req.include_images = false;
        let result = service().search_files(Parameters(req)).await.unwrap();
        assert_eq!(result.is_error, Some(false));

        let payload = structured(&result);
        assert_eq!(payload["total_results"], 1);
        let hit = &payload["results"][0];
        assert_eq!(hit["file"]["path"], "notes/todo.txt");
        assert_eq!(hit["file"]["storage"], "linux-home");
        assert_eq!(hit["matches"], json!(["buy milk"]));
        assert_eq!(hit["score"], 1);
        assert!(text(&result).contains("> buy milk"));
    }

    #[tokio::test]
    async fn test_search_files_includes_ocr_by_default() {
        let result = service()
            .search_files(Parameters(SearchFilesRequest::new("MILK")))
            .await
            .unwrap();
        assert_eq!(structured(&result)["total_results"], 2);
    }

    #[tokio::test]
    async fn test_search_files_no_results() {
        let result = service()
            .search_files(Parameters(SearchFilesRequest::new("zzzznotfound")))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(text(&result), "No files found matching query: \"zzzznotfound\"");
        assert_eq!(structured(&result)["total_results"], 0);
        assert_eq!(structured(&result)["results"], json!([]));
    }

    #[tokio::test]
    async fn test_search_files_whitespace_query_is_valid() {
        let result = service()
            .search_files(Parameters(SearchFilesRequest::new(" ")))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        // "buy milk" contains a space
        assert_eq!(structured(&result)["total_results"], 1);
    }

    #[tokio::test]
    async fn test_search_files_validation() {
        let service = service();
        let mut cases = vec![SearchFilesRequest::new("")];
        for max_results in [0, 101, -3] {
            let mut req = SearchFilesRequest::new("milk");
            req.max_results = max_results;
            cases.push(req);
        }
        for req in cases {
            let result = service.search_files(Parameters(req)).await.unwrap();
            assert_eq!(result.is_error, Some(true));
            assert!(text(&result).starts_with("Failed to search files: Invalid request"));
        }
    }

    #[tokio::test]
    async fn test_read_file_unknown_storage() {
        let result = service().read_file(read("unknown-id", "x.txt")).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            text(&result),
            "Failed to read file: Storage 'unknown-id' not found or not enabled"
        );
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn test_read_file_disabled_storage() {
        let result = service().read_file(read("macos-home", "x.txt")).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("not found or not enabled"));
    }

    #[tokio::test]
    async fn test_read_file_text_and_image() {
        let service = service();
        let result = service
            .read_file(read("linux-home", "notes/todo.txt"))
            .await
            .unwrap();
        assert_eq!(structured(&result)["content"], "buy milk\ncall mom");
        assert_eq!(structured(&result)["size"], 17);
        assert!(text(&result)
            .starts_with("# File: notes/todo.txt\n**Storage**: linux-home\n\n---\n\n"));

        let ocr = service
            .read_file(read("linux-home", "photos/scan.png"))
            .await
            .unwrap();
        assert_eq!(structured(&ocr)["content"], "TOTAL milk 3.50");

        let mut raw_req = read("linux-home", "photos/scan.png");
        raw_req.0.extract_text = false;
        let raw = service.read_file(raw_req).await.unwrap();
        assert_eq!(structured(&raw)["content"], "raw png bytes");
    }

    #[tokio::test]
    async fn test_read_file_missing_path() {
        let result = service()
            .read_file(read("linux-home", "nope.txt"))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Failed to read file: File unreadable"));
    }

    #[tokio::test]
    async fn test_list_files_root_and_recursive() {
        let service = service();
        let result = service.list_files(list("linux-home", "", false)).await.unwrap();
        let payload = structured(&result);
        assert_eq!(payload["directory"], "/");
        assert_eq!(payload["total_files"], 2);
        assert_eq!(payload["files"][0]["name"], "notes");
        assert_eq!(payload["files"][0]["is_directory"], true);

        let result = service.list_files(list("linux-home", "", true)).await.unwrap();
        let paths: Vec<_> = structured(&result)["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["notes", "notes/todo.txt", "photos", "photos/scan.png"]
        );
    }

    #[tokio::test]
    async fn test_list_files_empty_directory() {
        let result = service()
            .list_files(list("nas-storage", "empty", false))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(structured(&result)["directory"], "empty");
        assert_eq!(structured(&result)["files"], json!([]));
    }

    #[tokio::test]
    async fn test_list_files_rejects_parent_traversal() {
        let result = service()
            .list_files(list("linux-home", "../etc", false))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).starts_with("Failed to list files: Invalid path"));
    }

    #[test]
    fn test_structured_payload_attached() {
        let result = success("hi".to_string(), &json!({"a": 1}));
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.structured_content, Some(json!({"a": 1})));
        assert_eq!(text(&result), "hi");
    }
}
