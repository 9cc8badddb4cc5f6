//! Persona Manager for Darkelf Shell.
//!
//! Keeps the registry of identity profiles in memory and mirrors each one to
//! `<personas_dir>/<id>.json`. Single-threaded; no internal locking.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::types::errors::PersonaError;
use crate::types::persona::{default_personas, Persona, PersonaOverrides};

/// Trait defining persona registry operations.
pub trait PersonaManagerTrait {
    fn get(&self, id: &str) -> Option<&Persona>;
    fn list(&self) -> Vec<Persona>;
    fn create(&mut self, name: &str, overrides: PersonaOverrides) -> Result<Persona, PersonaError>;
    fn save(&mut self, persona: Persona) -> Result<(), PersonaError>;
    fn delete(&mut self, id: &str) -> Result<bool, PersonaError>;
}

/// File-backed persona registry.
pub struct PersonaManager {
    personas_dir: PathBuf,
    /// Load/insert order.
    personas: Vec<Persona>,
}

impl PersonaManager {
    /// Opens the registry at `personas_dir`: creates the directory, loads
    /// every record and seeds the defaults when nothing was loaded.
    pub fn new<P: Into<PathBuf>>(personas_dir: P) -> Result<Self, PersonaError> {
        let personas_dir = personas_dir.into();
        fs::create_dir_all(&personas_dir).map_err(|e| {
            PersonaError::IoError(format!(
                "Failed to create personas directory {}: {}",
                personas_dir.display(),
                e
            ))
        })?;

        let mut manager = Self {
            personas_dir,
            personas: Vec::new(),
        };
        manager.load()?;
        manager.bootstrap()?;
        Ok(manager)
    }

    /// Scans the directory for `*.json` records.
    ///
    /// A record that cannot be read, parsed or validated is skipped with a
    /// warning; it never aborts the load.
    fn load(&mut self) -> Result<(), PersonaError> {
        let entries = fs::read_dir(&self.personas_dir).map_err(|e| {
            PersonaError::IoError(format!("Failed to read personas directory: {}", e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
            .collect();
        files.sort();

        for path in files {
            match read_record(&path) {
                Ok(persona) => self.upsert_in_memory(persona),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping persona record");
                }
            }
        }

        tracing::debug!(count = self.personas.len(), "Loaded personas");
        Ok(())
    }

    /// Seeds the three canonical personas when the registry is empty.
    fn bootstrap(&mut self) -> Result<(), PersonaError> {
        if !self.personas.is_empty() {
            return Ok(());
        }
        for persona in default_personas() {
            self.save(persona)?;
        }
        tracing::info!(count = self.personas.len(), "Created default personas");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn personas_dir(&self) -> &Path {
        &self.personas_dir
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.personas_dir.join(format!("{}.json", id))
    }

    fn upsert_in_memory(&mut self, persona: Persona) {
        match self.personas.iter_mut().find(|p| p.id == persona.id) {
            Some(existing) => *existing = persona,
            None => self.personas.push(persona),
        }
    }
}

fn read_record(path: &Path) -> Result<Persona, PersonaError> {
    let content = fs::read_to_string(path)
        .map_err(|e| PersonaError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    let persona: Persona = serde_json::from_str(&content)
        .map_err(|e| PersonaError::SerializationError(e.to_string()))?;
    persona.validate()?;
    Ok(persona)
}

impl PersonaManagerTrait for PersonaManager {
    fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    fn list(&self) -> Vec<Persona> {
        self.personas.clone()
    }

    /// Creates a persona with a fresh UUID, default attributes and the given
    /// overrides, then persists it.
    fn create(&mut self, name: &str, overrides: PersonaOverrides) -> Result<Persona, PersonaError> {
        let persona = overrides.apply(Uuid::new_v4().to_string(), name.to_string());
        self.save(persona.clone())?;
        Ok(persona)
    }

    /// Upserts a persona: the record file is written first, the in-memory
    /// entry is replaced only once the write succeeded.
    fn save(&mut self, persona: Persona) -> Result<(), PersonaError> {
        persona.validate()?;

        let json = serde_json::to_string_pretty(&persona)
            .map_err(|e| PersonaError::SerializationError(e.to_string()))?;
        let path = self.record_path(&persona.id);
        fs::write(&path, json).map_err(|e| {
            PersonaError::IoError(format!("Failed to save persona {}: {}", persona.id, e))
        })?;

        tracing::info!(persona_id = %persona.id, name = %persona.name, "Saved persona");
        self.upsert_in_memory(persona);
        Ok(())
    }

    /// Removes the in-memory entry and its record file.
    ///
    /// Returns `Ok(false)` for an unknown id without touching anything.
    fn delete(&mut self, id: &str) -> Result<bool, PersonaError> {
        let Some(index) = self.personas.iter().position(|p| p.id == id) else {
            return Ok(false);
        };

        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(persona_id = %id, "Persona record file already missing");
            }
            Err(e) => {
                return Err(PersonaError::IoError(format!(
                    "Failed to delete persona file {}: {}",
                    id, e
                )));
            }
        }

        self.personas.remove(index);
        tracing::info!(persona_id = %id, "Deleted persona");
        Ok(true)
    }
}
