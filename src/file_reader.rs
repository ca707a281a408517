/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait FileReader {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn read_binary(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_binary(&self, path: &Path, data: &[u8]) -> Result<()>;
}

pub struct OsFileReader;

impl FileReader for OsFileReader {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(path)?)
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn write_binary(&self, path: &Path, data: &[u8]) -> Result<()> {
        Ok(fs::write(path, data)?)
    }
}

#[derive(Clone)]
enum FileData {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Default)]
pub struct MockFileReader {
    files: std::cell::RefCell<HashMap<PathBuf, FileData>>,
}

impl MockFileReader {
    pub fn add_file(&self, path: &str, content: &str) {
        self.files.borrow_mut().insert(PathBuf::from(path), FileData::Text(content.to_string()));
    }

    pub fn add_binary_file(&self, path: &str, content: &[u8]) {
        self.files.borrow_mut().insert(PathBuf::from(path), FileData::Binary(content.to_vec()));
    }

    pub fn written_binary(&self, path: &str) -> Option<Vec<u8>> {
        match self.files.borrow().get(&PathBuf::from(path)) {
            Some(FileData::Binary(content)) => Some(content.clone()),
            _ => None,
        }
    }
}

impl FileReader for MockFileReader {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.files.borrow().get(path) {
            Some(FileData::Text(content)) => Ok(content.clone()),
            Some(FileData::Binary(_)) => Err(anyhow::anyhow!("cannot read binary file as text: {}", path.display())),
            None => Err(anyhow::anyhow!("mock file not found: {}", path.display())),
        }
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>> {
        match self.files.borrow().get(path) {
            Some(FileData::Binary(content)) => Ok(content.clone()),
            Some(FileData::Text(_)) => Err(anyhow::anyhow!("cannot read text file as binary: {}", path.display())),
            None => Err(anyhow::anyhow!("mock file not found: {}", path.display())),
        }
    }

    fn write_binary(&self, path: &Path, data: &[u8]) -> Result<()> {
        self.files.borrow_mut().insert(path.to_path_buf(), FileData::Binary(data.to_vec()));
        Ok(())
    }
}
