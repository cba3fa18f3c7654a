// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast entity scanner using SIMD-accelerated byte searching
//!
//! Scans the DATA section of a STEP file to discover entity spans without
//! full parsing.

use memchr::memchr;

/// Fast entity scanner for IFC files
///
/// Uses memchr to quickly find entity boundaries; the tokenizer only runs on
/// the spans this scanner reports.
pub struct EntityScanner<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner for the given content
    pub fn new(content: &'a str) -> Self {
        // Skip header section (find DATA; line)
        let pos = content.find("DATA;").map(|p| p + 5).unwrap_or(0);

        Self { content, pos }
    }

    /// Scan to find the next entity
    ///
    /// Returns (id, type_name, start_byte, end_byte)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            // Use memchr for fast # search
            let hash_pos = memchr(b'#', &bytes[self.pos..])?;
            self.pos += hash_pos;

            // Entity definitions start a line; a # elsewhere is a reference
            let is_entity_start = self.pos == 0
                || bytes[self.pos - 1] == b'\n'
                || bytes[self.pos - 1] == b'\r'
                || bytes[self.pos - 1] == b';';

            if !is_entity_start {
                self.pos += 1;
                continue;
            }

            let start = self.pos;

            // Parse entity ID
            self.pos += 1; // Skip #
            let id_start = self.pos;

            while self.pos < bytes.len() && bytes[self.pos].is_ascii_digit() {
                self.pos += 1;
            }

            if self.pos == id_start {
                continue;
            }

            let id: u32 = self.content[id_start..self.pos].parse().ok()?;

            // Skip whitespace and =
            while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
                self.pos += 1;
            }

            if self.pos >= bytes.len() || bytes[self.pos] != b'=' {
                continue;
            }
            self.pos += 1; // Skip =

            while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
                self.pos += 1;
            }

            // Parse type name
            let type_start = self.pos;
            while self.pos < bytes.len()
                && (bytes[self.pos].is_ascii_alphanumeric() || bytes[self.pos] == b'_')
            {
                self.pos += 1;
            }

            if self.pos == type_start {
                continue;
            }

            let type_name = &self.content[type_start..self.pos];

            // Find end of entity (semicolon, but handle strings)
            let end = self.find_entity_end()?;

            return Some((id, type_name, start, end));
        }

        None
    }

    /// Find the end of an entity (semicolon), handling quoted strings
    fn find_entity_end(&mut self) -> Option<usize> {
        let bytes = self.content.as_bytes();
        let mut in_string = false;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' => {
                    // Check for escaped quote ''
                    if in_string && self.pos + 1 < bytes.len() && bytes[self.pos + 1] == b'\'' {
                        self.pos += 2;
                        continue;
                    }
                    in_string = !in_string;
                }
                b';' if !in_string => {
                    self.pos += 1;
                    return Some(self.pos);
                }
                _ => {}
            }
            self.pos += 1;
        }

        None
    }
}

/// Extract the schema version from the FILE_SCHEMA header record
pub fn schema_version(content: &str) -> Option<String> {
    let header_start = content.find("HEADER;")?;
    let header_end = content[header_start..]
        .find("ENDSEC;")
        .map(|p| header_start + p)?;
    let header = &content[header_start..header_end];

    let schema_start = header.find("FILE_SCHEMA")?;
    let list_start = header[schema_start..].find("((")? + schema_start + 2;
    let list_end = header[list_start..].find("))")? + list_start;
    let schema_list = &header[list_start..list_end];

    let quote_start = schema_list.find('\'')?;
    let quote_end = schema_list[quote_start + 1..].find('\'')? + quote_start + 1;
    Some(schema_list[quote_start + 1..quote_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('test.ifc','2024-01-01T00:00:00',('Author'),('Org'),'Preprocessor','App','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,'Project',$,$,$,$,$,$);
#2=IFCWALL('guid2',$,'Wall; with ''semicolon''',$,$,$,$,$);
#3=IFCPIPESEGMENT('guid3',$,'Pipe 1',$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_scanner_finds_entities() {
        let mut scanner = EntityScanner::new(TEST_IFC);
        let mut entities = Vec::new();

        while let Some((id, type_name, _, _)) = scanner.next_entity() {
            entities.push((id, type_name.to_string()));
        }

        assert_eq!(entities.len(), 3);
        assert_eq!(entities[0], (1, "IFCPROJECT".to_string()));
        assert_eq!(entities[2], (3, "IFCPIPESEGMENT".to_string()));
    }

    #[test]
    fn test_scanner_span_covers_quoted_semicolon() {
        let mut scanner = EntityScanner::new(TEST_IFC);
        scanner.next_entity();
        let (id, _, start, end) = scanner.next_entity().unwrap();
        assert_eq!(id, 2);
        let raw = &TEST_IFC[start..end];
        assert!(raw.starts_with("#2=IFCWALL"));
        assert!(raw.ends_with(");"));
        assert!(raw.contains("'Wall; with ''semicolon'''"));
    }

    #[test]
    fn test_schema_version() {
        assert_eq!(schema_version(TEST_IFC).as_deref(), Some("IFC4"));
    }
}
