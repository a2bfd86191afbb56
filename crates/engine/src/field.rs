//! 필드 저장소 -- 라인 하나의 추출 결과를 담는 네임스페이스
//!
//! [`FieldStore`]는 점(`.`)으로 구분된 필드 경로를 문자열 값에 매핑합니다.
//! 같은 필드에 다시 쓰면 마지막 값이 남습니다.
//! 라인마다 새로 만들거나 [`FieldStore::clear`]로 비운 뒤 재사용합니다.

use std::collections::BTreeMap;
use std::collections::btree_map;

/// 라인 단위 필드 저장소
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStore {
    fields: BTreeMap<String, String>,
}

impl FieldStore {
    /// 빈 저장소를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 값을 조회합니다.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// 필드가 설정되어 있는지 확인합니다.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// 필드 값을 설정합니다. 기존 값은 덮어씁니다.
    ///
    /// 이미 존재하는 필드는 기존 버퍼를 재사용합니다.
    pub fn set(&mut self, field: &str, value: &str) {
        match self.fields.get_mut(field) {
            Some(existing) => {
                existing.clear();
                existing.push_str(value);
            }
            None => {
                self.fields.insert(field.to_owned(), value.to_owned());
            }
        }
    }

    /// 소유한 값으로 필드를 설정합니다.
    pub fn set_owned(&mut self, field: &str, value: String) {
        match self.fields.get_mut(field) {
            Some(existing) => *existing = value,
            None => {
                self.fields.insert(field.to_owned(), value);
            }
        }
    }

    /// 필드를 제거하고 이전 값을 반환합니다.
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.fields.remove(field)
    }

    /// 캡처 목록을 순서대로 병합합니다.
    pub fn merge_captures(&mut self, captures: &[(&str, &str)]) {
        for (name, value) in captures {
            self.set(name, value);
        }
    }

    /// 모든 필드를 제거합니다.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 필드를 이름 순으로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 저장소를 소비하여 필드 맵을 반환합니다.
    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    /// 필드 맵을 꺼내고 저장소를 비웁니다.
    pub fn take_fields(&mut self) -> BTreeMap<String, String> {
        std::mem::take(&mut self.fields)
    }
}

impl IntoIterator for FieldStore {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
