// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection with the PDF standard security handler (RC4, 128-bit).
// The one password supplied opens the document and also owns it.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lopdf::xref::XrefEntry;
use lopdf::{
    Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions, Reader, StringFormat,
};
use stampdoc_core::error::{Result, StampdocError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// RC4 key length in bits.
pub const KEY_LENGTH: usize = 128;

/// Give `doc` a file identifier if it has none; key derivation needs one.
fn ensure_file_id(doc: &mut Document) {
    if doc.trailer.has(b"ID") {
        return;
    }
    let id = Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

/// Encrypt `doc` in memory.
pub fn encrypt_document(doc: &mut Document, password: &str) -> Result<()> {
    ensure_file_id(doc);
    let state = {
        let version = EncryptionVersion::V2 {
            document: &*doc,
            owner_password: password,
            user_password: password,
            key_length: KEY_LENGTH,
            permissions: Permissions::all(),
        };
        EncryptionState::try_from(version).map_err(|err| StampdocError::Encryption(err.to_string()))?
    };
    doc.encrypt(&state)
        .map_err(|err| StampdocError::Encryption(err.to_string()))?;
    Ok(())
}

/// Rewrite the PDF at `path` so it requires `password` to open.
#[instrument(skip(password), fields(path = %path.display()))]
pub fn encrypt_in_place(path: &Path, password: &str) -> Result<()> {
    let mut doc = Document::load(path).map_err(|err| {
        StampdocError::Encryption(format!("cannot reopen {}: {}", path.display(), err))
    })?;
    encrypt_document(&mut doc, password)?;
    doc.save(path).map_err(|err| {
        StampdocError::Encryption(format!("cannot write {}: {}", path.display(), err))
    })?;
    info!(pages = doc.get_pages().len(), "Document encrypted");
    Ok(())
}

/// Parse every object listed in the cross-reference table of `buffer`,
/// leaving strings and streams encrypted.
fn load_undecrypted(buffer: &[u8], shell: Document) -> Document {
    let reader = Reader {
        buffer,
        document: shell,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };
    let objects: Vec<(ObjectId, Object)> = reader
        .document
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .filter_map(|id| match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => Some((id, object)),
            Err(err) => {
                warn!(object = ?id, %err, "Skipping unreadable object");
                None
            }
        })
        .collect();

    let mut doc = reader.document;
    for (id, object) in objects {
        doc.objects.entry(id).or_insert(object);
    }
    doc
}

/// Open a protected PDF with `password`.
///
/// `Document::load` only decrypts files whose user password is empty, so
/// the objects are parsed here and decrypted once the password checks out.
#[instrument(skip(password), fields(path = %path.display()))]
pub fn open_protected(path: &Path, password: &str) -> Result<Document> {
    let buffer = std::fs::read(path)
        .map_err(|err| StampdocError::Encryption(format!("cannot read {}: {}", path.display(), err)))?;
    let shell = Document::load_mem(&buffer)
        .map_err(|err| StampdocError::Encryption(format!("cannot open {}: {}", path.display(), err)))?;
    if !shell.is_encrypted() {
        return Err(StampdocError::Encryption(format!(
            "{} is not password protected",
            path.display()
        )));
    }
    shell
        .authenticate_password(password)
        .map_err(|_| StampdocError::Encryption("incorrect password".into()))?;

    let mut doc = load_undecrypted(&buffer, shell);
    doc.decrypt(password)
        .map_err(|err| StampdocError::Encryption(format!("cannot decrypt {}: {}", path.display(), err)))?;
    debug!(pages = doc.get_pages().len(), "Protected document opened");
    Ok(doc)
}
