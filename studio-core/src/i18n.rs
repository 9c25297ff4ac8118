//! Localization: language selection and translation tables.
//!
//! The active language is a field of the session, never an ambient global.
//! Switching language builds the matching [`Translations`] table and hands it
//! to the engine, which keeps exactly one table (last write wins).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Translation keys for user-facing messages produced by the core.
pub mod keys {
    /// Generic import failure.
    pub const IMPORT_FAILED: &str = "import.failed";
    /// Import rejected by validation.
    pub const IMPORT_INVALID: &str = "import.invalid";
    /// File type not recognised.
    pub const IMPORT_UNSUPPORTED: &str = "import.unsupported";
    /// File exceeds the size limit.
    pub const IMPORT_TOO_LARGE: &str = "import.too_large";
    /// Drop gesture rejected as a whole.
    pub const DROP_REJECTED: &str = "drop.rejected";
    /// Saving to durable storage failed.
    pub const PERSIST_FAILED: &str = "persist.failed";
    /// Status label: idle.
    pub const STATUS_IDLE: &str = "status.idle";
    /// Status label: loading.
    pub const STATUS_LOADING: &str = "status.loading";
    /// Status label: ready.
    pub const STATUS_READY: &str = "status.ready";
    /// Status label: error.
    pub const STATUS_ERROR: &str = "status.error";
}

/// Languages with a bundled translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// English (fallback).
    #[default]
    #[serde(rename = "en")]
    En,
    /// French.
    #[serde(rename = "fr")]
    Fr,
    /// Indonesian.
    #[serde(rename = "id")]
    Id,
    /// Russian.
    #[serde(rename = "ru")]
    Ru,
    /// Brazilian Portuguese.
    #[serde(rename = "pt-br")]
    PtBr,
    /// Simplified Chinese.
    #[serde(rename = "zh-ch")]
    ZhCh,
}

impl Language {
    /// All bundled languages.
    pub const ALL: [Self; 6] = [Self::En, Self::Fr, Self::Id, Self::Ru, Self::PtBr, Self::ZhCh];

    /// Resolve a language code by prefix (`fr-CA` -> French); unknown codes fall back to English.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        if code.starts_with("fr") {
            Self::Fr
        } else if code.starts_with("id") {
            Self::Id
        } else if code.starts_with("ru") {
            Self::Ru
        } else if code.starts_with("pt") {
            Self::PtBr
        } else if code.starts_with("zh") {
            Self::ZhCh
        } else {
            Self::En
        }
    }

    /// Canonical code of this language.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::Id => "id",
            Self::Ru => "ru",
            Self::PtBr => "pt-br",
            Self::ZhCh => "zh-ch",
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::En => EN,
            Self::Fr => FR,
            Self::Id => ID,
            Self::Ru => RU,
            Self::PtBr => PT_BR,
            Self::ZhCh => ZH_CH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A translation table for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translations {
    language: Language,
    entries: BTreeMap<String, String>,
}

impl Translations {
    /// Build the bundled table for a language, filling gaps from English.
    #[must_use]
    pub fn for_language(language: Language) -> Self {
        let mut entries: BTreeMap<String, String> = EN
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        for (key, value) in language.table() {
            entries.insert((*key).to_string(), (*value).to_string());
        }
        Self { language, entries }
    }

    /// Language of this table.
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Look up a key; unknown keys are returned verbatim.
    #[must_use]
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self::for_language(Language::En)
    }
}

const EN: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "Can not load the project."),
    (keys::IMPORT_INVALID, "Can not load the project. See console for details."),
    (keys::IMPORT_UNSUPPORTED, "This file type is not supported."),
    (keys::IMPORT_TOO_LARGE, "This file is too large to import."),
    (keys::DROP_REJECTED, "Only files can be dropped onto the editor."),
    (keys::PERSIST_FAILED, "Your design could not be saved."),
    (keys::STATUS_IDLE, "Idle"),
    (keys::STATUS_LOADING, "Loading..."),
    (keys::STATUS_READY, "Ready"),
    (keys::STATUS_ERROR, "Error"),
];

const FR: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "Impossible de charger le projet."),
    (keys::IMPORT_INVALID, "Impossible de charger le projet. Voir la console pour plus de détails."),
    (keys::IMPORT_UNSUPPORTED, "Ce type de fichier n'est pas pris en charge."),
    (keys::IMPORT_TOO_LARGE, "Ce fichier est trop volumineux pour être importé."),
    (keys::DROP_REJECTED, "Seuls des fichiers peuvent être déposés dans l'éditeur."),
    (keys::PERSIST_FAILED, "Votre design n'a pas pu être enregistré."),
    (keys::STATUS_IDLE, "En attente"),
    (keys::STATUS_LOADING, "Chargement..."),
    (keys::STATUS_READY, "Prêt"),
    (keys::STATUS_ERROR, "Erreur"),
];

const ID: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "Tidak dapat memuat proyek."),
    (keys::IMPORT_INVALID, "Tidak dapat memuat proyek. Lihat konsol untuk detailnya."),
    (keys::IMPORT_UNSUPPORTED, "Jenis file ini tidak didukung."),
    (keys::IMPORT_TOO_LARGE, "File ini terlalu besar untuk diimpor."),
    (keys::DROP_REJECTED, "Hanya file yang dapat dijatuhkan ke editor."),
    (keys::PERSIST_FAILED, "Desain Anda tidak dapat disimpan."),
    (keys::STATUS_IDLE, "Menunggu"),
    (keys::STATUS_LOADING, "Memuat..."),
    (keys::STATUS_READY, "Siap"),
    (keys::STATUS_ERROR, "Kesalahan"),
];

const RU: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "Не удалось загрузить проект."),
    (keys::IMPORT_INVALID, "Не удалось загрузить проект. Подробности в консоли."),
    (keys::IMPORT_UNSUPPORTED, "Этот тип файла не поддерживается."),
    (keys::IMPORT_TOO_LARGE, "Файл слишком большой для импорта."),
    (keys::DROP_REJECTED, "В редактор можно перетаскивать только файлы."),
    (keys::PERSIST_FAILED, "Не удалось сохранить дизайн."),
    (keys::STATUS_IDLE, "Ожидание"),
    (keys::STATUS_LOADING, "Загрузка..."),
    (keys::STATUS_READY, "Готово"),
    (keys::STATUS_ERROR, "Ошибка"),
];

const PT_BR: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "Não foi possível carregar o projeto."),
    (keys::IMPORT_INVALID, "Não foi possível carregar o projeto. Veja o console para detalhes."),
    (keys::IMPORT_UNSUPPORTED, "Este tipo de arquivo não é suportado."),
    (keys::IMPORT_TOO_LARGE, "Este arquivo é grande demais para importar."),
    (keys::DROP_REJECTED, "Apenas arquivos podem ser soltos no editor."),
    (keys::PERSIST_FAILED, "Não foi possível salvar seu design."),
    (keys::STATUS_IDLE, "Ocioso"),
    (keys::STATUS_LOADING, "Carregando..."),
    (keys::STATUS_READY, "Pronto"),
    (keys::STATUS_ERROR, "Erro"),
];

// Status labels fall back to English.
const ZH_CH: &[(&str, &str)] = &[
    (keys::IMPORT_FAILED, "无法加载项目。"),
    (keys::IMPORT_INVALID, "无法加载项目。详情请查看控制台。"),
    (keys::IMPORT_UNSUPPORTED, "不支持此文件类型。"),
    (keys::IMPORT_TOO_LARGE, "文件太大，无法导入。"),
    (keys::DROP_REJECTED, "只能将文件拖放到编辑器中。"),
    (keys::PERSIST_FAILED, "无法保存您的设计。"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_prefix_matching() {
        assert_eq!(Language::from_code("fr"), Language::Fr);
        assert_eq!(Language::from_code("fr-CA"), Language::Fr);
        assert_eq!(Language::from_code("pt"), Language::PtBr);
        assert_eq!(Language::from_code("PT-BR"), Language::PtBr);
        assert_eq!(Language::from_code("zh-TW"), Language::ZhCh);
        assert_eq!(Language::from_code("id"), Language::Id);
        assert_eq!(Language::from_code("ru_RU"), Language::Ru);
    }

    #[test]
    fn test_unknown_code_falls_back_to_english() {
        assert_eq!(Language::from_code("de"), Language::En);
        assert_eq!(Language::from_code(""), Language::En);
    }

    #[test]
    fn test_code_round_trips() {
        for lang in Language::ALL {
            assert_eq!(Language::from_code(lang.code()), lang);
        }
    }

    #[test]
    fn test_every_table_covers_english_keys() {
        let english = Translations::for_language(Language::En);
        for lang in Language::ALL {
            let table = Translations::for_language(lang);
            assert_eq!(table.len(), english.len(), "{lang} table size");
            assert_eq!(table.language(), lang);
        }
    }

    #[test]
    fn test_lookup_and_fallbacks() {
        let fr = Translations::for_language(Language::Fr);
        assert_eq!(fr.get(keys::STATUS_READY), "Prêt");
        assert_eq!(fr.get("no.such.key"), "no.such.key");

        let zh = Translations::for_language(Language::ZhCh);
        assert_eq!(zh.get(keys::STATUS_READY), "Ready");
        assert_eq!(zh.get(keys::IMPORT_FAILED), "无法加载项目。");
    }

    #[test]
    fn test_language_serde_uses_codes() {
        let json = serde_json::to_string(&Language::PtBr).expect("serialize");
        assert_eq!(json, "\"pt-br\"");
    }
}
