use std::cell::Cell;
use std::error::Error;
use std::fs;
use std::rc::Rc;

use tempfile::tempdir;
use wastudio_project::{
    ContentStore, File, FileKind, LocalStore, MemoryStore, Node, Project, ProjectError,
};

fn memory_project(paths: &[&str]) -> (Rc<MemoryStore>, Project) {
    let store = Rc::new(MemoryStore::new());
    for path in paths {
        store.insert_file(path);
    }
    let project = Project::new(Some(store.clone() as Rc<dyn ContentStore>));
    (store, project)
}

#[tokio::test]
async fn adding_a_fresh_name_is_retrievable_with_matching_kind() -> Result<(), Box<dyn Error>> {
    let (_store, project) = memory_project(&["lib.rs"]);
    let root = project.root();
    root.add_file(&Node::File(File::named("module.wat"))).await?;

    let found = root
        .get_immediate_child("module.wat")
        .await?
        .expect("added file should be listed");
    assert_eq!(found.kind(), FileKind::Wat);
    Ok(())
}

#[tokio::test]
async fn duplicate_names_are_renamed_and_both_survive() -> Result<(), Box<dyn Error>> {
    let (_store, project) = memory_project(&["src/main.rs"]);
    let src = project
        .root()
        .get_file("src")
        .await?
        .and_then(Node::into_directory)
        .expect("src directory");

    let duplicate = File::named("main.rs");
    src.add_file(&Node::File(duplicate.clone())).await?;
    assert_ne!(duplicate.name(), "main.rs");

    assert!(src.get_immediate_child("main.rs").await?.is_some());
    assert!(src.get_immediate_child(&duplicate.name()).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn list_glob_and_get_file_agree() -> Result<(), Box<dyn Error>> {
    let (_store, project) = memory_project(&["a.txt", "sub/b.txt", "sub/c.txt"]);
    let root = project.root();

    let listed = root.list().await?;
    assert_eq!(listed, vec!["a.txt", "sub/b.txt", "sub/c.txt"]);
    assert_eq!(root.glob("sub/*.txt").await?, vec!["sub/b.txt", "sub/c.txt"]);

    let b = root.get_file("sub/b.txt").await?.expect("sub/b.txt");
    assert_eq!(b.path(), listed[1]);
    assert!(root.get_file("sub/missing.txt").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn removing_with_the_wrong_parent_never_succeeds() -> Result<(), Box<dyn Error>> {
    let (store, project) = memory_project(&["a.txt", "sub/b.txt"]);
    let root = project.root();
    let b = root.get_file("sub/b.txt").await?.expect("sub/b.txt");

    let err = root.remove_file(&b).await.unwrap_err();
    assert!(matches!(err, ProjectError::ParentMismatch { .. }));
    assert!(store.contains("sub/b.txt"));
    Ok(())
}

#[tokio::test]
async fn nested_changes_reach_the_project_once() -> Result<(), Box<dyn Error>> {
    let (_store, project) = memory_project(&["a/b/c/d/leaf.txt"]);
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    project
        .on_did_change()
        .register(move || counter.set(counter.get() + 1));

    let deepest = project
        .root()
        .get_file("a/b/c/d")
        .await?
        .and_then(Node::into_directory)
        .expect("a/b/c/d");
    deepest.notify_did_change_children();
    assert_eq!(hits.get(), 1);

    deepest.remove_file(&deepest.get_immediate_child("leaf.txt").await?.unwrap()).await?;
    assert_eq!(hits.get(), 2);
    Ok(())
}

#[tokio::test]
async fn local_store_round_trip_through_the_tree() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("sub"))?;
    fs::write(dir.path().join("sub/b.txt"), "b")?;

    let project = Project::new(Some(Rc::new(LocalStore::new(dir.path())) as Rc<dyn ContentStore>));
    let root = project.root();

    let notebook = root
        .new_file("notebooks/Analysis.ipynb", FileKind::JupyterNotebook, false, false)
        .await?;
    assert_eq!(notebook.path(), "notebooks/Analysis.ipynb");
    assert!(dir.path().join("notebooks/Analysis.ipynb").is_file());

    let copy = root
        .new_file("sub/b.txt", FileKind::PlainText, false, true)
        .await?;
    assert_eq!(copy.path(), "sub/b.2.txt");

    assert_eq!(
        root.list().await?,
        vec!["notebooks/Analysis.ipynb", "sub/b.2.txt", "sub/b.txt"]
    );
    Ok(())
}
