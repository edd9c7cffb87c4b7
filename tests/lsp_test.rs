//! LSP サーバーの統合テスト
//!
//! `Backend` を直接呼び出し、開いたカタログに対する各機能を確認します。

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
#![allow(missing_docs)]
#![allow(deprecated)]

use pretty_assertions::assert_eq;
use linguist_language_server::Backend;
use serde_json::{
    Value,
    json,
};
use tower_lsp::lsp_types::*;
use tower_lsp::{
    LanguageServer,
    LspService,
};

const CATALOG_URI: &str = "file:///workspace/translations/app_de.ts";

const DE_CATALOG: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1" language="de">
<context>
    <name>MainWindow</name>
    <message>
        <location filename="../mainwindow.cpp" line="42"/>
        <source>Open</source>
        <translation>Öffnen</translation>
    </message>
    <message>
        <source>Save</source>
        <translation type="unfinished">Speichern</translation>
    </message>
</context>
</TS>
"#;

fn create_test_backend() -> Backend {
    let (service, _socket) = LspService::new(Backend::new);
    service.inner().clone()
}

fn initialize_params() -> InitializeParams {
    InitializeParams { capabilities: ClientCapabilities::default(), ..InitializeParams::default() }
}

/// 初期化して `uri` を開いた状態の Backend を作る
async fn backend_with_open_file(uri: &str, text: &str) -> Backend {
    let backend = create_test_backend();
    backend.initialize(initialize_params()).await.unwrap();
    backend.initialized(InitializedParams {}).await;
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: Url::parse(uri).unwrap(),
                language_id: "xml".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
    backend
}

fn position_params(uri: &str, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: Url::parse(uri).unwrap() },
        position: Position { line, character },
    }
}

async fn execute(backend: &Backend, command: &str, arguments: Vec<Value>) -> Option<Value> {
    backend
        .execute_command(ExecuteCommandParams {
            command: command.to_string(),
            arguments,
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_initialize_advertises_capabilities() {
    let backend = create_test_backend();

    let result = backend.initialize(initialize_params()).await.unwrap();
    let capabilities = result.capabilities;

    match capabilities.hover_provider.unwrap() {
        HoverProviderCapability::Simple(enabled) => assert!(enabled),
        _ => panic!("Expected Simple hover provider capability"),
    }
    assert_eq!(capabilities.definition_provider, Some(OneOf::Left(true)));
    assert_eq!(capabilities.references_provider, Some(OneOf::Left(true)));
    let commands = capabilities.execute_command_provider.unwrap().commands;
    assert_eq!(
        commands,
        vec![
            "linguist.catalogStats",
            "linguist.markFinished",
            "linguist.updateCatalog",
            "linguist.translate",
            "linguist.reindex",
        ]
    );
    assert_eq!(result.server_info.unwrap().name, "linguist-language-server");
}

#[tokio::test]
async fn test_hover_shows_translation() {
    let backend = backend_with_open_file(CATALOG_URI, DE_CATALOG).await;

    let hover = backend
        .hover(HoverParams {
            text_document_position_params: position_params(CATALOG_URI, 7, 18),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    let HoverContents::Markup(markup) = hover.contents else {
        panic!("Expected Markup content");
    };
    assert_eq!(markup.kind, MarkupKind::Markdown);
    assert!(markup.value.contains("`MainWindow`"), "{}", markup.value);
    assert!(markup.value.contains("Öffnen"), "{}", markup.value);
}

#[tokio::test]
async fn test_hover_ignores_typescript_sources() {
    let uri = "file:///workspace/src/main.ts";
    let backend = backend_with_open_file(uri, "export const answer = 42;\n").await;

    let hover = backend
        .hover(HoverParams {
            text_document_position_params: position_params(uri, 0, 14),
            work_done_progress_params: WorkDoneProgressParams::default(),
        })
        .await
        .unwrap();

    assert!(hover.is_none());
}

#[tokio::test]
async fn test_goto_definition_resolves_location() {
    let backend = backend_with_open_file(CATALOG_URI, DE_CATALOG).await;

    let response = backend
        .goto_definition(GotoDefinitionParams {
            text_document_position_params: position_params(CATALOG_URI, 7, 18),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    let GotoDefinitionResponse::Array(locations) = response else {
        panic!("Expected an array of locations");
    };
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri.path(), "/workspace/mainwindow.cpp");
    assert_eq!(locations[0].range.start.line, 41);
}

#[tokio::test]
async fn test_code_action_for_unfinished_message() {
    let backend = backend_with_open_file(CATALOG_URI, DE_CATALOG).await;
    let uri = Url::parse(CATALOG_URI).unwrap();

    let actions = backend
        .code_action(CodeActionParams {
            text_document: TextDocumentIdentifier { uri },
            range: Range {
                start: Position { line: 11, character: 18 },
                end: Position { line: 11, character: 18 },
            },
            context: CodeActionContext::default(),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(actions.len(), 1);
    let CodeActionOrCommand::CodeAction(action) = &actions[0] else {
        panic!("Expected a code action");
    };
    assert_eq!(action.kind, Some(CodeActionKind::QUICKFIX));
}

#[tokio::test]
async fn test_catalog_stats_command() {
    let backend = backend_with_open_file(CATALOG_URI, DE_CATALOG).await;

    let stats = execute(&backend, "linguist.catalogStats", vec![json!(CATALOG_URI)]).await.unwrap();

    assert_eq!(stats["language"], "de");
    assert_eq!(stats["messages"], 2);
    assert_eq!(stats["finished"], 1);
    assert_eq!(stats["unfinished"], 1);
    assert_eq!(stats["completionPercent"], 50);
}

#[tokio::test]
async fn test_translate_command() {
    let backend = backend_with_open_file(CATALOG_URI, DE_CATALOG).await;

    let open =
        execute(&backend, "linguist.translate", vec![json!("de"), json!("MainWindow"), json!("Open")])
            .await;
    let save =
        execute(&backend, "linguist.translate", vec![json!("de"), json!("MainWindow"), json!("Save")])
            .await;
    let missing =
        execute(&backend, "linguist.translate", vec![json!("de"), json!("MainWindow"), json!("Quit")])
            .await;

    assert_eq!(open, Some(json!("Öffnen")));
    assert_eq!(save, Some(json!("Speichern")));
    assert_eq!(missing, Some(Value::Null));
}

#[tokio::test]
async fn test_update_catalog_command_writes_target() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("app.ts");
    let target_path = dir.path().join("app_de.ts");
    std::fs::write(
        &template_path,
        r#"<?xml version="1.0" encoding="utf-8"?>
<!DOCTYPE TS>
<TS version="2.1">
<context>
    <name>MainWindow</name>
    <message>
        <source>Open</source>
        <translation type="unfinished"></translation>
    </message>
    <message>
        <source>Quit</source>
        <translation type="unfinished"></translation>
    </message>
</context>
</TS>
"#,
    )
    .unwrap();
    std::fs::write(&target_path, DE_CATALOG).unwrap();

    let backend = create_test_backend();
    backend.initialize(initialize_params()).await.unwrap();
    backend.initialized(InitializedParams {}).await;

    let report = execute(
        &backend,
        "linguist.updateCatalog",
        vec![
            json!(template_path.to_string_lossy()),
            json!(target_path.to_string_lossy()),
            json!(true),
        ],
    )
    .await
    .unwrap();

    assert_eq!(report["kept"], 1);
    assert_eq!(report["added"], 1);
    assert_eq!(report["dropped"], 1);

    let written = std::fs::read_to_string(&target_path).unwrap();
    assert!(written.contains("<source>Quit</source>"), "{written}");
    assert!(written.contains("Öffnen"), "{written}");
    assert!(!written.contains("Speichern"), "{written}");
    assert!(written.contains("sourcelanguage=\"en\""), "{written}");
}

#[tokio::test]
async fn test_update_catalog_command_creates_target_with_source_language() {
    let dir = tempfile::tempdir().unwrap();
    let template_path = dir.path().join("app.ts");
    let target_path = dir.path().join("app_fr.ts");
    std::fs::write(&template_path, DE_CATALOG.replace(" language=\"de\"", "")).unwrap();
    std::fs::write(dir.path().join(".linguist-ls.json"), r#"{"sourceLanguage": "ja"}"#).unwrap();

    let backend = create_test_backend();
    backend
        .initialize(InitializeParams {
            root_uri: Some(Url::from_directory_path(dir.path()).unwrap()),
            ..initialize_params()
        })
        .await
        .unwrap();

    let report = execute(
        &backend,
        "linguist.updateCatalog",
        vec![json!("app.ts"), json!("app_fr.ts")],
    )
    .await
    .unwrap();

    assert_eq!(report["added"], 2);
    let written = std::fs::read_to_string(&target_path).unwrap();
    assert!(written.contains("language=\"fr\""), "{written}");
    assert!(written.contains("sourcelanguage=\"ja\""), "{written}");
}

#[tokio::test]
async fn test_reindex_keeps_open_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("app_de.ts");
    std::fs::write(&catalog_path, DE_CATALOG).unwrap();
    let catalog_uri = Url::from_file_path(&catalog_path).unwrap();

    let backend = create_test_backend();
    backend
        .initialize(InitializeParams {
            root_uri: Some(Url::from_directory_path(dir.path()).unwrap()),
            ..initialize_params()
        })
        .await
        .unwrap();
    backend.initialized(InitializedParams {}).await;

    let stats =
        execute(&backend, "linguist.catalogStats", vec![json!(catalog_uri.as_str())]).await.unwrap();
    assert_eq!(stats["messages"], 2);

    let edited = DE_CATALOG.replace(
        "</context>",
        "    <message>\n        <source>Quit</source>\n        <translation>Beenden</translation>\n    </message>\n</context>",
    );
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: catalog_uri.clone(),
                language_id: "xml".to_string(),
                version: 1,
                text: edited,
            },
        })
        .await;

    execute(&backend, "linguist.reindex", Vec::new()).await;

    let stats =
        execute(&backend, "linguist.catalogStats", vec![json!(catalog_uri.as_str())]).await.unwrap();
    assert_eq!(stats["messages"], 3);
    assert_eq!(stats["finished"], 2);
}
