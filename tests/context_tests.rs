use logchat::context::{
    assemble, ContextSelection, ContextSources, FileBuffer, OpenArtifact, LOGS_LABEL,
};

fn sources() -> ContextSources {
    ContextSources {
        opened: Some(OpenArtifact {
            name: "boot.log".to_string(),
            text: "X".to_string(),
        }),
        logs: "ERROR: timeout".to_string(),
        files: vec![
            FileBuffer::in_memory("fileA", "fileA", "int main() {}"),
            FileBuffer::in_memory("fileB", "fileB", "fn main() {}"),
        ],
    }
}

#[tokio::test]
async fn test_opened_content_uses_open_file() {
    let assembled = assemble(&ContextSelection::OpenedContent, &sources())
        .await
        .unwrap();

    assert_eq!(assembled.text, "File boot.log:\nX\n\n");
    assert_eq!(assembled.labels, vec!["boot.log"]);
}

#[tokio::test]
async fn test_opened_content_without_open_file_uses_logs() {
    let sources = ContextSources {
        opened: None,
        ..sources()
    };
    let assembled = assemble(&ContextSelection::OpenedContent, &sources)
        .await
        .unwrap();

    assert_eq!(assembled.text, "Execution Logs:\nERROR: timeout\n\n");
    assert_eq!(assembled.labels, vec![LOGS_LABEL]);
}

#[tokio::test]
async fn test_explicit_sources_keep_selection_order() {
    let selection = ContextSelection::parse("logs,fileA");
    let assembled = assemble(&selection, &sources()).await.unwrap();

    assert_eq!(
        assembled.text,
        "Execution Logs:\nERROR: timeout\n\nFile fileA:\nint main() {}\n\n"
    );
    assert_eq!(assembled.labels, vec!["Execution Logs", "fileA"]);
}

#[tokio::test]
async fn test_unknown_sources_fall_back_to_opened_content() {
    let selection = ContextSelection::parse("missing.txt");
    let assembled = assemble(&selection, &sources()).await.unwrap();

    assert_eq!(assembled.labels, vec!["boot.log"]);
}

#[tokio::test]
async fn test_unknown_sources_are_skipped_among_known_ones() {
    let selection = ContextSelection::parse("missing.txt,fileB");
    let assembled = assemble(&selection, &sources()).await.unwrap();

    assert_eq!(assembled.text, "File fileB:\nfn main() {}\n\n");
    assert_eq!(assembled.labels, vec!["fileB"]);
}

#[tokio::test]
async fn test_file_named_like_a_reserved_id_stays_selectable() {
    let mut sources = ContextSources {
        logs: "LOGTEXT".to_string(),
        ..ContextSources::default()
    };
    let logs_file = sources.add_file(FileBuffer::in_memory("logs", "logs", "FILETEXT"));
    let opened_file = sources.add_file(FileBuffer::in_memory("opened", "opened", "O"));
    let again = sources.add_file(FileBuffer::in_memory("logs", "logs", "SECOND"));
    assert_eq!(logs_file, "logs#2");
    assert_eq!(opened_file, "opened#2");
    assert_eq!(again, "logs#3");

    let mut selection = ContextSelection::OpenedContent;
    selection.toggle("logs");
    let assembled = assemble(&selection, &sources).await.unwrap();
    assert_eq!(assembled.text, "Execution Logs:\nLOGTEXT\n\n");

    selection.toggle(&logs_file);
    selection.toggle(&again);
    let assembled = assemble(&selection, &sources).await.unwrap();
    assert_eq!(
        assembled.text,
        "Execution Logs:\nLOGTEXT\n\nFile logs:\nFILETEXT\n\nFile logs:\nSECOND\n\n"
    );
    assert_eq!(assembled.labels, vec!["Execution Logs", "logs", "logs"]);
}

#[tokio::test]
async fn test_on_disk_file_is_read_at_assembly_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.py");
    std::fs::write(&path, "print('v1')").unwrap();

    let sources = ContextSources {
        files: vec![FileBuffer::on_disk(&path)],
        ..ContextSources::default()
    };
    let selection = ContextSelection::parse("app.py");

    let first = assemble(&selection, &sources).await.unwrap();
    assert_eq!(first.text, "File app.py:\nprint('v1')\n\n");

    std::fs::write(&path, "print('v2')").unwrap();
    let second = assemble(&selection, &sources).await.unwrap();
    assert_eq!(second.text, "File app.py:\nprint('v2')\n\n");
}

#[tokio::test]
async fn test_unreadable_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let sources = ContextSources {
        files: vec![FileBuffer::on_disk(dir.path().join("gone.txt"))],
        ..ContextSources::default()
    };

    let error = assemble(&ContextSelection::parse("gone.txt"), &sources)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("gone.txt"));
}
