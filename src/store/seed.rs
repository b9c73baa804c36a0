use time::OffsetDateTime;
use tracing::info;

use super::{save, Collection, RecordStore};
use crate::{
    auth::{
        password::{hash_password, PasswordScheme},
        repo_types::{Role, User},
    },
    students::repo_types::{Links, Student, StudentStatus, DEFAULT_PHOTO},
};

/// Writes fixture users and students for any collection that does not exist
/// yet. Existing collections are never touched.
pub async fn ensure_seed_data(store: &dyn RecordStore, scheme: PasswordScheme) -> anyhow::Result<()> {
    let now = OffsetDateTime::now_utc();

    if !store.exists(Collection::Users).await {
        let users = vec![
            User {
                id: 1,
                username: "admin".into(),
                password_hash: hash_password("admin123", scheme)?,
                role: Role::Admin,
                email: Some("admin@college.example".into()),
                created_at: now,
            },
            User {
                id: 2,
                username: "student1".into(),
                password_hash: hash_password("student123", scheme)?,
                role: Role::Student,
                email: Some("student1@college.example".into()),
                created_at: now,
            },
        ];
        anyhow::ensure!(save(store, Collection::Users, &users).await, "seed users");
        info!(count = users.len(), "seeded users collection");
    }

    if !store.exists(Collection::Students).await {
        let students = fixture_students(now);
        anyhow::ensure!(
            save(store, Collection::Students, &students).await,
            "seed students"
        );
        info!(count = students.len(), "seeded students collection");
    }

    Ok(())
}

fn links(handle: &str) -> Links {
    Links {
        github: Some(format!("https://github.com/{handle}")),
        portfolio: Some(format!("https://{handle}.dev")),
        ..Links::default()
    }
}

fn skills(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn fixture_students(now: OffsetDateTime) -> Vec<Student> {
    vec![
        Student {
            id: 1,
            name: "Ivan Ivanov".into(),
            course: 1,
            status: StudentStatus::Studying,
            description: "Backend developer into Python and SQL".into(),
            full_info: "First-year student learning Python and databases.".into(),
            institution: "College of Information Technology No. 1".into(),
            skills: skills(&["Python", "SQL", "PostgreSQL"]),
            links: links("ivanov"),
            photo: DEFAULT_PHOTO.into(),
            created_at: now,
            updated_at: now,
            user_id: Some(1),
        },
        Student {
            id: 2,
            name: "Maria Petrova".into(),
            course: 3,
            status: StudentStatus::Studying,
            description: "Frontend developer focused on React".into(),
            full_info: "Third-year student who has shipped several React projects.".into(),
            institution: "College of Information Technology No. 1".into(),
            skills: skills(&["JavaScript", "React", "HTML", "CSS"]),
            links: links("maria"),
            photo: DEFAULT_PHOTO.into(),
            created_at: now,
            updated_at: now,
            user_id: Some(2),
        },
        Student {
            id: 3,
            name: "Alexey Sidorov".into(),
            course: 2,
            status: StudentStatus::Studying,
            description: "Data science, interested in machine learning".into(),
            full_info: "Second-year student studying Python, maths and ML.".into(),
            institution: "Technical College".into(),
            skills: skills(&["Python", "Pandas", "NumPy", "Scikit-learn"]),
            links: links("alexey"),
            photo: DEFAULT_PHOTO.into(),
            created_at: now,
            updated_at: now,
            user_id: None,
        },
    ]
}
