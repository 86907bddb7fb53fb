//! Sample sheets shipped in `data/`, copied into a scratch directory

use tempfile::TempDir;

const SHEETS: [(&str, &str); 6] = [
    ("students.toon", include_str!("../data/students.toon")),
    ("teachers.toon", include_str!("../data/teachers.toon")),
    ("subjects.toon", include_str!("../data/subjects.toon")),
    ("subgroups.toon", include_str!("../data/subgroups.toon")),
    ("statements.toon", include_str!("../data/statements.toon")),
    ("groups.toon", include_str!("../data/groups.toon")),
];

pub fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in SHEETS {
        std::fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}
