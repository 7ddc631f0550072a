//! 初始词汇
//!
//! 首次运行（词库为空）时写入一组入门词汇，按分类排列。

use crate::storage::{NewVocabularyEntry, StorageResult, VocabularyRepository};

struct SeedWord {
    chinese: &'static str,
    pinyin: &'static str,
    spanish: &'static str,
}

const fn w(chinese: &'static str, pinyin: &'static str, spanish: &'static str) -> SeedWord {
    SeedWord {
        chinese,
        pinyin,
        spanish,
    }
}

const STARTER_VOCABULARY: &[(&str, &[SeedWord])] = &[
    (
        "Saludos y Cortesía",
        &[
            w("你好", "nǐ hǎo", "Hola"),
            w("再见", "zài jiàn", "Adiós"),
            w("谢谢", "xiè xie", "Gracias"),
            w("请", "qǐng", "Por favor"),
            w("对不起", "duì bu qǐ", "Lo siento"),
            w("没关系", "méi guān xi", "No importa"),
            w("欢迎", "huān yíng", "Bienvenido"),
        ],
    ),
    (
        "Números",
        &[
            w("一", "yī", "Uno"),
            w("二", "èr", "Dos"),
            w("三", "sān", "Tres"),
            w("四", "sì", "Cuatro"),
            w("五", "wǔ", "Cinco"),
            w("六", "liù", "Seis"),
            w("七", "qī", "Siete"),
            w("八", "bā", "Ocho"),
            w("九", "jiǔ", "Nueve"),
            w("十", "shí", "Diez"),
        ],
    ),
    (
        "Familia",
        &[
            w("爸爸", "bà ba", "Papá"),
            w("妈妈", "mā ma", "Mamá"),
            w("儿子", "ér zi", "Hijo"),
            w("女儿", "nǚ ér", "Hija"),
            w("哥哥", "gē ge", "Hermano mayor"),
            w("姐姐", "jiě jie", "Hermana mayor"),
            w("弟弟", "dì di", "Hermano menor"),
            w("妹妹", "mèi mei", "Hermana menor"),
        ],
    ),
    (
        "Aula",
        &[
            w("老师", "lǎo shī", "Profesor/a"),
            w("学生", "xué sheng", "Estudiante"),
            w("问题", "wèn tí", "Pregunta"),
            w("答案", "dá àn", "Respuesta"),
            w("汉语", "hàn yǔ", "Chino (idioma)"),
            w("明白", "míng bai", "Entender"),
            w("说", "shuō", "Hablar/Decir"),
            w("听", "tīng", "Escuchar"),
        ],
    ),
    (
        "Colores",
        &[
            w("红色", "hóng sè", "Rojo"),
            w("蓝色", "lán sè", "Azul"),
            w("绿色", "lǜ sè", "Verde"),
            w("黄色", "huáng sè", "Amarillo"),
            w("黑色", "hēi sè", "Negro"),
            w("白色", "bái sè", "Blanco"),
            w("紫色", "zǐ sè", "Morado"),
        ],
    ),
    (
        "Tiempo",
        &[
            w("今天", "jīn tiān", "Hoy"),
            w("明天", "míng tiān", "Mañana"),
            w("昨天", "zuó tiān", "Ayer"),
            w("现在", "xiàn zài", "Ahora"),
            w("早上", "zǎo shang", "Mañana (AM)"),
            w("晚上", "wǎn shang", "Noche"),
            w("年", "nián", "Año"),
            w("月", "yuè", "Mes"),
            w("天", "tiān", "Día"),
        ],
    ),
];

pub fn starter_entries() -> Vec<NewVocabularyEntry> {
    STARTER_VOCABULARY
        .iter()
        .flat_map(|(category, words)| {
            words
                .iter()
                .map(move |word| NewVocabularyEntry::new(word.chinese, word.pinyin, word.spanish, *category))
        })
        .collect()
}

/// 词库为空时写入初始词汇，返回写入条数
pub fn seed_if_empty(repo: &VocabularyRepository) -> StorageResult<usize> {
    if !repo.is_empty()? {
        tracing::debug!("vocabulary already present, skipping seed");
        return Ok(0);
    }
    seed(repo)
}

/// 无条件写入初始词汇（已存在的词不去重）
pub fn seed(repo: &VocabularyRepository) -> StorageResult<usize> {
    let inserted = repo.add_batch(starter_entries())?.len();
    tracing::info!(count = inserted, "seeded starter vocabulary");
    Ok(inserted)
}
