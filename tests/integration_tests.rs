/// Integration tests for fdn
///
/// These tests drive complete batches through `fdn::cli` against real
/// temporary directories, with in-memory confirmation input and output.
///
/// Test categories:
/// 1. Dry run and in-place normalization
/// 2. Reverse renames through the ledger
/// 3. Existing destinations
/// 4. Interactive confirmation
/// 5. Traversal: depth, directories, hidden entries, excludes
/// 6. Dictionary configuration
/// 7. Explicit moves
use fdn::cli::{
    CliError, ConfigTarget, RunOptions, RunReport, config_add, config_delete, config_list,
    move_entry, run_rename,
};
use fdn::confirm::Confirmer;
use fdn::dictionary::Dictionary;
use fdn::ledger::Ledger;
use fdn::walker::{Depth, EntryKind};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture with a working directory to normalize and a separate
/// state directory holding the ledger and dictionary files.
struct TestFixture {
    temp_dir: TempDir,
    state_dir: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with fresh temporary directories.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let state_dir = TempDir::new().expect("Failed to create state directory");
        TestFixture {
            temp_dir,
            state_dir,
        }
    }

    /// Get the path to the working directory.
    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn ledger_path(&self) -> PathBuf {
        self.state_dir.path().join("ledger.json")
    }

    fn config_path(&self) -> PathBuf {
        self.state_dir.path().join("config.toml")
    }

    /// Create a file with content in the working directory.
    fn create_text_file(&self, name: &str, content: &str) {
        let file_path = self.path().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    /// Create a (possibly nested) subdirectory in the working directory.
    fn create_subdir(&self, name: &str) {
        fs::create_dir_all(self.path().join(name)).expect("Failed to create subdirectory");
    }

    fn read(&self, rel_path: &str) -> String {
        fs::read_to_string(self.path().join(rel_path)).expect("Failed to read file")
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_file(),
            "File should exist: {}",
            path.display()
        );
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    fn assert_dir_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(
            path.exists() && path.is_dir(),
            "Directory should exist: {}",
            path.display()
        );
    }

    /// Options for a preview of the working directory.
    fn options(&self) -> RunOptions {
        RunOptions {
            paths: vec![self.path().to_path_buf()],
            ..RunOptions::default()
        }
    }

    fn in_place(&self) -> RunOptions {
        RunOptions {
            in_place: true,
            ..self.options()
        }
    }

    fn reverse(&self) -> RunOptions {
        RunOptions {
            reverse: true,
            ..self.in_place()
        }
    }

    /// Run a batch with the default dictionary.
    fn run(&self, options: &RunOptions) -> (RunReport, String) {
        self.run_with(options, &Dictionary::default(), "")
    }

    /// Run a batch with the given dictionary and confirmation answers.
    fn run_with(
        &self,
        options: &RunOptions,
        dictionary: &Dictionary,
        answers: &str,
    ) -> (RunReport, String) {
        let mut ledger = Ledger::open(&self.ledger_path()).expect("Failed to open ledger");
        let mut confirmer =
            Confirmer::new(Cursor::new(answers.as_bytes().to_vec()), Vec::<u8>::new());
        let mut out = Vec::new();
        let report = run_rename(options, dictionary, &mut ledger, &mut confirmer, &mut out)
            .expect("Batch should run");
        (report, String::from_utf8(out).expect("Output should be UTF-8"))
    }

    fn ledger(&self) -> Ledger {
        Ledger::open(&self.ledger_path()).expect("Failed to open ledger")
    }
}

// ============================================================================
// Test Suite 1: Dry Run and In-Place Normalization
// ============================================================================

#[test]
fn test_empty_directory() {
    let fixture = TestFixture::new();
    let (report, output) = fixture.run(&fixture.in_place());
    assert_eq!(report, RunReport::default());
    assert!(output.is_empty());
}

#[test]
fn test_dry_run_previews_without_renaming() {
    let fixture = TestFixture::new();
    fixture.create_text_file("my notes (draft).txt", "notes");

    let (report, output) = fixture.run(&fixture.options());

    assert_eq!(report.previewed, 1);
    assert_eq!(report.renamed, 0);
    assert!(output.contains("   my notes (draft).txt\n-->my_notes_draft.txt\n"));
    assert!(output.contains("dry run"));
    fixture.assert_file_exists("my notes (draft).txt");
    fixture.assert_file_not_exists("my_notes_draft.txt");
    assert!(!fixture.ledger_path().exists(), "Dry run must not write the ledger");
}

#[test]
fn test_in_place_rename() {
    let fixture = TestFixture::new();
    fixture.create_text_file("my notes (draft).txt", "notes");

    let (report, output) = fixture.run(&fixture.in_place());

    assert_eq!(report.renamed, 1);
    assert!(output.contains("==>my_notes_draft.txt"));
    assert!(!output.contains("dry run"));
    fixture.assert_file_not_exists("my notes (draft).txt");
    fixture.assert_file_exists("my_notes_draft.txt");
    assert_eq!(fixture.read("my_notes_draft.txt"), "notes");
    assert_eq!(
        fixture.ledger().lookup_reverse("my_notes_draft.txt").as_deref(),
        Some("my notes (draft).txt")
    );
}

#[test]
fn test_normalized_names_are_left_alone() {
    let fixture = TestFixture::new();
    fixture.create_text_file("already_clean.txt", "");
    fixture.create_text_file("123_456_789", "");

    let (report, output) = fixture.run(&fixture.in_place());

    assert_eq!(report, RunReport::default());
    assert!(output.is_empty());
    assert!(!fixture.ledger_path().exists());
}

#[test]
fn test_extension_is_preserved() {
    let fixture = TestFixture::new();
    fixture.create_text_file("Flutter实战：第二版.pdf", "");
    fixture.create_text_file("【2023】report.md", "");

    fixture.run(&fixture.in_place());

    fixture.assert_file_exists("Flutter实战_第二版.pdf");
    fixture.assert_file_exists("2023_report.md");
}

#[test]
fn test_non_ascii_head_gets_ascii_prefix() {
    let fixture = TestFixture::new();
    fixture.create_text_file("中文 笔记.txt", "");

    fixture.run(&fixture.in_place());

    let names: Vec<String> = fs::read_dir(fixture.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    let name = &names[0];
    assert!(name.ends_with("中文_笔记.txt"), "unexpected name {}", name);
    let head: Vec<char> = name.chars().take(3).collect();
    assert!(head.iter().all(|c| c.is_ascii_uppercase()));
}

#[test]
fn test_term_words_are_protected_and_replaced() {
    let fixture = TestFixture::new();
    fixture.create_text_file("learn k.flutter now.txt", "");
    let mut dictionary = Dictionary::default();
    dictionary.insert_term_word("k.flutter:KFlutter").unwrap();

    fixture.run_with(&fixture.in_place(), &dictionary, "");

    fixture.assert_file_exists("learn_KFlutter_now.txt");
}

#[test]
fn test_full_path_display() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    let options = RunOptions {
        full_path: true,
        ..fixture.options()
    };

    let (_, output) = fixture.run(&options);

    let expected = fixture.path().join("a_b.txt");
    assert!(output.contains(&format!("-->{}", expected.display())));
}

// ============================================================================
// Test Suite 2: Reverse Renames
// ============================================================================

#[test]
fn test_reverse_restores_original_names() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "one");
    fixture.create_text_file("c-d.txt", "two");

    let (forward, _) = fixture.run(&fixture.in_place());
    assert_eq!(forward.renamed, 2);
    fixture.assert_file_exists("a_b.txt");
    fixture.assert_file_exists("c_d.txt");

    let (reverse, output) = fixture.run(&fixture.reverse());
    assert_eq!(reverse.renamed, 2);
    assert!(output.contains("==>a b.txt"));
    fixture.assert_file_exists("a b.txt");
    fixture.assert_file_exists("c-d.txt");
    fixture.assert_file_not_exists("a_b.txt");
    assert!(fixture.ledger().is_empty(), "Reversed records are consumed");
}

#[test]
fn test_reverse_dry_run_keeps_ledger() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.run(&fixture.in_place());

    let options = RunOptions {
        reverse: true,
        ..fixture.options()
    };
    let (report, output) = fixture.run(&options);

    assert_eq!(report.previewed, 1);
    assert!(output.contains("-->a b.txt"));
    fixture.assert_file_exists("a_b.txt");
    assert_eq!(fixture.ledger().count("a b.txt", "a_b.txt").unwrap(), 1);
}

#[test]
fn test_reverse_without_history_does_nothing() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a_b.txt", "");

    let (report, output) = fixture.run(&fixture.reverse());

    assert_eq!(report, RunReport::default());
    assert!(output.is_empty());
    fixture.assert_file_exists("a_b.txt");
}

#[test]
fn test_repeated_forward_and_reverse_cycles() {
    let fixture = TestFixture::new();
    fixture.create_text_file("x y", "");

    for _ in 0..3 {
        fixture.run(&fixture.in_place());
        fixture.assert_file_exists("x_y");
        fixture.run(&fixture.reverse());
        fixture.assert_file_exists("x y");
    }
    assert!(fixture.ledger().is_empty());
}

// ============================================================================
// Test Suite 3: Existing Destinations
// ============================================================================

#[test]
fn test_existing_destination_is_reported() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "new");
    fixture.create_text_file("a_b.txt", "old");

    let (report, output) = fixture.run(&fixture.in_place());

    assert_eq!(report.skipped, 1);
    assert_eq!(report.renamed, 0);
    assert!(output.contains("[EXIST]"));
    assert_eq!(fixture.read("a_b.txt"), "old");
    fixture.assert_file_exists("a b.txt");
    assert!(fixture.ledger().is_empty());
}

#[test]
fn test_overwrite_replaces_destination() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "new");
    fixture.create_text_file("a_b.txt", "old");
    let options = RunOptions {
        overwrite: true,
        ..fixture.in_place()
    };

    let (report, _) = fixture.run(&options);

    assert_eq!(report.renamed, 1);
    assert_eq!(fixture.read("a_b.txt"), "new");
    fixture.assert_file_not_exists("a b.txt");
}

#[test]
fn test_identical_destination_is_replaced() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "same");
    fixture.create_text_file("a_b.txt", "same");

    let (report, output) = fixture.run(&fixture.in_place());

    assert_eq!(report.renamed, 1);
    assert!(!output.contains("[EXIST]"));
    fixture.assert_file_not_exists("a b.txt");
}

// ============================================================================
// Test Suite 4: Interactive Confirmation
// ============================================================================

fn confirm_options(fixture: &TestFixture) -> RunOptions {
    RunOptions {
        confirm: true,
        ..fixture.in_place()
    }
}

#[test]
fn test_confirm_yes_and_no() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.txt", "");

    // Candidates are visited in descending order: "c d.txt" first.
    let (report, _) =
        fixture.run_with(&confirm_options(&fixture), &Dictionary::default(), "y\nn\n");

    assert_eq!(report.renamed, 1);
    assert_eq!(report.declined, 1);
    fixture.assert_file_exists("c_d.txt");
    fixture.assert_file_exists("a b.txt");
}

#[test]
fn test_confirm_default_repeats_previous_answer() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.txt", "");

    let (report, _) =
        fixture.run_with(&confirm_options(&fixture), &Dictionary::default(), "y\n\n");

    assert_eq!(report.renamed, 2);
}

#[test]
fn test_confirm_all_applies_remaining() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.txt", "");
    fixture.create_text_file("e f.txt", "");

    let (report, _) = fixture.run_with(&confirm_options(&fixture), &Dictionary::default(), "A\n");

    assert_eq!(report.renamed, 3);
}

#[test]
fn test_confirm_quit_stops_batch() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.txt", "");

    let (report, _) =
        fixture.run_with(&confirm_options(&fixture), &Dictionary::default(), "y\nq\n");

    assert!(report.quit);
    assert_eq!(report.renamed, 1);
    fixture.assert_file_exists("c_d.txt");
    fixture.assert_file_exists("a b.txt");
}

#[test]
fn test_confirm_alone_prompts_and_renames() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");

    let options = RunOptions {
        confirm: true,
        in_place: false,
        ..fixture.options()
    };
    let (report, output) = fixture.run_with(&options, &Dictionary::default(), "y\n");

    assert_eq!(report.renamed, 1);
    assert_eq!(report.previewed, 0);
    assert!(!output.contains("dry run"));
    fixture.assert_file_exists("a_b.txt");
    fixture.assert_file_not_exists("a b.txt");
}

#[test]
fn test_confirm_end_of_input_declines() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");

    let (report, _) = fixture.run_with(&confirm_options(&fixture), &Dictionary::default(), "");

    assert_eq!(report.declined, 1);
    fixture.assert_file_exists("a b.txt");
}

// ============================================================================
// Test Suite 5: Traversal
// ============================================================================

#[test]
fn test_default_depth_is_shallow() {
    let fixture = TestFixture::new();
    fixture.create_subdir("sub dir");
    fixture.create_text_file("sub dir/x y.txt", "");

    let (report, _) = fixture.run(&fixture.in_place());

    assert_eq!(report.renamed, 0);
    fixture.assert_file_exists("sub dir/x y.txt");
}

#[test]
fn test_unbounded_depth_reaches_nested_files() {
    let fixture = TestFixture::new();
    fixture.create_subdir("sub dir/deeper dir");
    fixture.create_text_file("sub dir/deeper dir/x y.txt", "");
    let options = RunOptions {
        depth: Depth::Unbounded,
        ..fixture.in_place()
    };

    fixture.run(&options);

    fixture.assert_file_exists("sub dir/deeper dir/x_y.txt");
    fixture.assert_dir_exists("sub dir");
}

#[test]
fn test_directory_mode_renames_children_before_parents() {
    let fixture = TestFixture::new();
    fixture.create_subdir("top dir/inner dir");
    fixture.create_text_file("top dir/inner dir/keep me.txt", "");
    let options = RunOptions {
        depth: Depth::Unbounded,
        kind: EntryKind::Directories,
        ..fixture.in_place()
    };

    let (report, _) = fixture.run(&options);

    assert_eq!(report.renamed, 2);
    assert_eq!(report.failed, 0);
    fixture.assert_dir_exists("top_dir/inner_dir");
    fixture.assert_file_exists("top_dir/inner_dir/keep me.txt");
}

#[test]
fn test_directory_names_keep_dots() {
    let fixture = TestFixture::new();
    fixture.create_subdir("v1.2 release");
    let options = RunOptions {
        kind: EntryKind::Directories,
        ..fixture.in_place()
    };

    fixture.run(&options);

    fixture.assert_dir_exists("v1.2_release");
}

#[test]
fn test_hidden_entries_are_skipped_by_default() {
    let fixture = TestFixture::new();
    fixture.create_text_file(".hidden note", "");

    let (report, _) = fixture.run(&fixture.options());
    assert_eq!(report.previewed, 0);

    let options = RunOptions {
        include_hidden: true,
        ..fixture.options()
    };
    let (report, _) = fixture.run(&options);
    assert_eq!(report.previewed, 1);
}

#[test]
fn test_exclude_patterns() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.log", "");
    let options = RunOptions {
        excludes: vec!["*.log".to_string()],
        ..fixture.in_place()
    };

    let (report, _) = fixture.run(&options);

    assert_eq!(report.renamed, 1);
    fixture.assert_file_exists("c d.log");
    fixture.assert_file_exists("a_b.txt");
}

#[test]
fn test_single_file_input() {
    let fixture = TestFixture::new();
    fixture.create_text_file("a b.txt", "");
    fixture.create_text_file("c d.txt", "");
    let options = RunOptions {
        paths: vec![fixture.path().join("a b.txt")],
        ..fixture.in_place()
    };

    fixture.run(&options);

    fixture.assert_file_exists("a_b.txt");
    fixture.assert_file_exists("c d.txt");
}

#[test]
fn test_invalid_exclude_pattern_aborts() {
    let fixture = TestFixture::new();
    let options = RunOptions {
        excludes: vec!["[oops".to_string()],
        ..fixture.options()
    };
    let mut ledger = Ledger::in_memory();
    let mut confirmer = Confirmer::new(Cursor::new(Vec::<u8>::new()), Vec::<u8>::new());
    let mut out = Vec::new();

    let result = run_rename(
        &options,
        &Dictionary::default(),
        &mut ledger,
        &mut confirmer,
        &mut out,
    );
    assert!(matches!(result, Err(CliError::Walk(_))));
}

// ============================================================================
// Test Suite 6: Dictionary Configuration
// ============================================================================

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_config_add_list_delete_term_words() {
    let fixture = TestFixture::new();
    let path = fixture.config_path();
    let mut out = Vec::new();

    config_add(
        &path,
        ConfigTarget::TermWords,
        &strings(&["K.Flutter:KFlutter", "c++:CPP"]),
        &mut out,
    )
    .unwrap();
    config_add(&path, ConfigTarget::TermWords, &strings(&["k.flutter:Other"]), &mut out).unwrap();
    let messages = String::from_utf8(out).unwrap();
    assert!(messages.contains("exists k.flutter:Other"));

    let dictionary = Dictionary::load(Some(&path)).unwrap();
    let mut listed = Vec::new();
    config_list(&dictionary, Some(ConfigTarget::TermWords), &mut listed).unwrap();
    assert_eq!(
        String::from_utf8(listed).unwrap(),
        "k.flutter:KFlutter\nc++:CPP\n"
    );

    config_delete(&path, ConfigTarget::TermWords, &strings(&["K.FLUTTER"]), &mut Vec::new())
        .unwrap();
    let dictionary = Dictionary::load(Some(&path)).unwrap();
    assert_eq!(dictionary.list_term_words().len(), 1);
}

#[test]
fn test_config_separator() {
    let fixture = TestFixture::new();
    let path = fixture.config_path();

    config_add(&path, ConfigTarget::Separator, &strings(&["-"]), &mut Vec::new()).unwrap();
    assert_eq!(Dictionary::load(Some(&path)).unwrap().get_separator().value, "-");

    let err = config_add(&path, ConfigTarget::Separator, &strings(&["a", "b"]), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, CliError::SeparatorArity(2)));

    config_delete(&path, ConfigTarget::Separator, &[], &mut Vec::new()).unwrap();
    assert_eq!(Dictionary::load(Some(&path)).unwrap().get_separator().value, "_");
}

#[test]
fn test_config_to_sep_words() {
    let fixture = TestFixture::new();
    let path = fixture.config_path();

    config_add(&path, ConfigTarget::ToSepWords, &strings(&["."]), &mut Vec::new()).unwrap();
    let dictionary = Dictionary::load(Some(&path)).unwrap();
    assert_eq!(dictionary.list_to_sep_words().last().unwrap().value, ".");

    fixture.create_subdir("v1.2 release");
    let options = RunOptions {
        kind: EntryKind::Directories,
        ..fixture.in_place()
    };
    fixture.run_with(&options, &dictionary, "");
    fixture.assert_dir_exists("v1_2_release");

    config_delete(&path, ConfigTarget::ToSepWords, &strings(&[".", "@@"]), &mut Vec::new())
        .unwrap();
    let dictionary = Dictionary::load(Some(&path)).unwrap();
    assert!(dictionary.list_to_sep_words().iter().all(|w| w.value != "."));
}

#[test]
fn test_config_rejects_uncompilable_term_word() {
    let fixture = TestFixture::new();
    let path = fixture.config_path();

    let result = config_add(&path, ConfigTarget::TermWords, &strings(&["broken(:x"]), &mut Vec::new());

    assert!(matches!(result, Err(CliError::Pipeline(_))));
    assert!(!path.exists());
}

#[test]
fn test_custom_separator_end_to_end() {
    let fixture = TestFixture::new();
    fixture.create_text_file("--a  b--.txt", "");
    let mut dictionary = Dictionary::default();
    dictionary.set_separator("-").unwrap();

    fixture.run_with(&fixture.in_place(), &dictionary, "");

    fixture.assert_file_exists("a-b.txt");
}

// ============================================================================
// Test Suite 7: Explicit Moves
// ============================================================================

#[test]
fn test_move_is_recorded_and_reversible() {
    let fixture = TestFixture::new();
    fixture.create_text_file("draft.txt", "content");

    let mut ledger = fixture.ledger();
    move_entry(
        &fixture.path().join("draft.txt"),
        &fixture.path().join("final.txt"),
        &mut ledger,
    )
    .unwrap();
    fixture.assert_file_exists("final.txt");
    fixture.assert_file_not_exists("draft.txt");

    fixture.run(&fixture.reverse());
    fixture.assert_file_exists("draft.txt");
    assert_eq!(fixture.read("draft.txt"), "content");
}

#[test]
fn test_move_missing_source() {
    let fixture = TestFixture::new();
    let mut ledger = Ledger::in_memory();

    let result = move_entry(
        &fixture.path().join("nope.txt"),
        &fixture.path().join("other.txt"),
        &mut ledger,
    );

    assert!(matches!(result, Err(CliError::SourceMissing(_))));
    assert!(ledger.is_empty());
}

#[test]
fn test_move_onto_existing_target() {
    let fixture = TestFixture::new();
    fixture.create_text_file("one.txt", "1");
    fixture.create_text_file("two.txt", "2");
    let mut ledger = Ledger::in_memory();

    let result = move_entry(
        &fixture.path().join("one.txt"),
        &fixture.path().join("two.txt"),
        &mut ledger,
    );

    assert!(matches!(result, Err(CliError::TargetExists(_))));
    assert_eq!(fixture.read("two.txt"), "2");
}
