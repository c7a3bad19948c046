use std::env;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const AYAH_API_BASE: &str = "https://api.alquran.cloud/v1";
pub const HADITH_API_BASE: &str = "https://hadithapi.com/api";
const DEFAULT_HADITH_API_KEY: &str = "$2y$10$4rTM9bbsY1QuH0HE2W0gufDS33KuX32Kdi50kfx9v9LJHyA2K2y";

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)";

/// Total ayat in the Qur'an; verse numbers are drawn from 1..=6236.
const AYAH_COUNT: u32 = 6236;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no response shape yielded a complete item")]
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyItem {
    #[serde(rename = "ref")]
    pub reference: String,
    pub arabic: String,
    pub english: String,
    pub urdu: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyCards {
    pub ayah: DailyItem,
    pub hadith: DailyItem,
    pub loaded_at: String,
}

/// Session-scoped cache. Cards stay stable during rapid interactions and are
/// replaced only by an explicit refresh.
#[derive(Debug, Default)]
pub struct DailyCache {
    cards: Option<DailyCards>,
}

impl DailyCache {
    pub fn get_or_load<F>(&mut self, load: F) -> DailyCards
    where
        F: FnOnce() -> DailyCards,
    {
        match &self.cards {
            Some(cards) => cards.clone(),
            None => {
                let cards = load();
                self.cards = Some(cards.clone());
                cards
            }
        }
    }

    pub fn refresh<F>(&mut self, load: F) -> DailyCards
    where
        F: FnOnce() -> DailyCards,
    {
        let cards = load();
        self.cards = Some(cards.clone());
        cards
    }
}

struct CuratedItem {
    reference: &'static str,
    arabic: &'static str,
    english: &'static str,
    urdu: &'static str,
}

impl CuratedItem {
    fn to_item(&self) -> DailyItem {
        DailyItem {
            reference: self.reference.to_string(),
            arabic: self.arabic.to_string(),
            english: self.english.to_string(),
            urdu: self.urdu.to_string(),
            source: "Curated Backup".to_string(),
        }
    }
}

const AYAT_FALLBACK: [CuratedItem; 4] = [
    CuratedItem {
        reference: "Qur'an 2:286",
        arabic: "لَا يُكَلِّفُ اللَّهُ نَفْسًا إِلَّا وُسْعَهَا",
        english: "Allah does not burden a soul beyond that it can bear.",
        urdu: "اللہ کسی جان پر اس کی طاقت سے بڑھ کر بوجھ نہیں ڈالتا۔",
    },
    CuratedItem {
        reference: "Qur'an 13:28",
        arabic: "أَلَا بِذِكْرِ اللَّهِ تَطْمَئِنُّ الْقُلُوبُ",
        english: "Verily, in the remembrance of Allah do hearts find rest.",
        urdu: "خبردار! اللہ کے ذکر ہی سے دلوں کو اطمینان حاصل ہوتا ہے۔",
    },
    CuratedItem {
        reference: "Qur'an 94:5-6",
        arabic: "فَإِنَّ مَعَ الْعُسْرِ يُسْرًا ۝ إِنَّ مَعَ الْعُسْرِ يُسْرًا",
        english: "Indeed, with hardship comes ease. Indeed, with hardship comes ease.",
        urdu: "پس بے شک مشکل کے ساتھ آسانی ہے، بے شک مشکل کے ساتھ آسانی ہے۔",
    },
    CuratedItem {
        reference: "Qur'an 14:7",
        arabic: "لَئِن شَكَرْتُمْ لَأَزِيدَنَّكُمْ",
        english: "If you are grateful, I will surely increase you.",
        urdu: "اگر تم شکر کرو گے تو میں تمہیں اور زیادہ دوں گا۔",
    },
];

const HADITH_FALLBACK: [CuratedItem; 4] = [
    CuratedItem {
        reference: "Sahih Bukhari & Sahih Muslim",
        arabic: "إِنَّمَا الأَعْمَالُ بِالنِّيَّاتِ",
        english: "Actions are judged by intentions.",
        urdu: "اعمال کا دارومدار نیتوں پر ہے۔",
    },
    CuratedItem {
        reference: "Sahih Bukhari & Sahih Muslim",
        arabic: "مَنْ كَانَ يُؤْمِنُ بِاللَّهِ وَالْيَوْمِ الآخِرِ فَلْيَقُلْ خَيْرًا أَوْ لِيَصْمُتْ",
        english: "Whoever believes in Allah and the Last Day should speak good or remain silent.",
        urdu: "جو اللہ اور آخرت کے دن پر ایمان رکھتا ہے وہ بھلائی کی بات کرے یا خاموش رہے۔",
    },
    CuratedItem {
        reference: "Sahih Muslim",
        arabic: "لَا يُؤْمِنُ أَحَدُكُمْ حَتَّى يُحِبَّ لِأَخِيهِ مَا يُحِبُّ لِنَفْسِهِ",
        english: "None of you truly believes until he loves for his brother what he loves for himself.",
        urdu: "تم میں سے کوئی کامل مومن نہیں جب تک اپنے بھائی کے لیے وہی پسند نہ کرے جو اپنے لیے پسند کرتا ہے۔",
    },
    CuratedItem {
        reference: "Sahih Bukhari & Sahih Muslim",
        arabic: "لَيْسَ الشَّدِيدُ بِالصُّرَعَةِ، إِنَّمَا الشَّدِيدُ الَّذِي يَمْلِكُ نَفْسَهُ عِنْدَ الغَضَبِ",
        english: "The strong person is the one who controls himself when angry.",
        urdu: "طاقتور وہ نہیں جو کشتی میں غالب آئے، طاقتور وہ ہے جو غصے کے وقت اپنے آپ کو قابو میں رکھے۔",
    },
];

pub fn fallback_ayah() -> DailyItem {
    let idx = rand::thread_rng().gen_range(0..AYAT_FALLBACK.len());
    AYAT_FALLBACK[idx].to_item()
}

pub fn fallback_hadith() -> DailyItem {
    let idx = rand::thread_rng().gen_range(0..HADITH_FALLBACK.len());
    HADITH_FALLBACK[idx].to_item()
}

pub fn http_client() -> Result<Client, FetchError> {
    Ok(Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?)
}

fn hadith_api_key() -> String {
    env::var("HADITH_API_KEY")
        .unwrap_or_else(|_| DEFAULT_HADITH_API_KEY.to_string())
        .trim()
        .to_string()
}

fn hadith_api_base() -> String {
    env::var("HADITH_API_BASE_URL")
        .unwrap_or_else(|_| HADITH_API_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn fetch_json(client: &Client, url: &str) -> Result<Value, FetchError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()?;
    Ok(response.error_for_status()?.json()?)
}

fn fetch_json_with_query(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value, FetchError> {
    let response = client
        .get(url)
        .query(query)
        .header("Accept", "application/json")
        .send()?;
    Ok(response.error_for_status()?.json()?)
}

fn non_empty_str(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn first_non_empty(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| non_empty_str(&obj[*key]))
}

fn parse_ayah_editions(payload: &Value) -> Option<DailyItem> {
    let data = payload.get("data")?.as_array()?;
    if data.len() < 2 {
        return None;
    }

    let arabic = non_empty_str(&data[0]["text"])?;
    let english = non_empty_str(&data[1]["text"])?;
    let urdu = data
        .get(2)
        .and_then(|edition| non_empty_str(&edition["text"]))
        .unwrap_or_default();
    let surah = data[0]["surah"]["number"].as_u64()?;
    let verse = data[0]["numberInSurah"].as_u64()?;

    Some(DailyItem {
        reference: format!("Qur'an {}:{}", surah, verse),
        arabic,
        english,
        urdu,
        source: "AlQuran.cloud".to_string(),
    })
}

fn parse_ayah_singles(arabic: &Value, english: &Value, urdu: &Value) -> Option<DailyItem> {
    let ar = arabic.get("data")?;
    let en = english.get("data")?;

    let arabic_text = non_empty_str(&ar["text"])?;
    let english_text = non_empty_str(&en["text"])?;
    let urdu_text = urdu
        .get("data")
        .and_then(|data| non_empty_str(&data["text"]))
        .unwrap_or_default();
    let surah = ar["surah"]["number"].as_u64()?;
    let verse = ar["numberInSurah"].as_u64()?;

    Some(DailyItem {
        reference: format!("Qur'an {}:{}", surah, verse),
        arabic: arabic_text,
        english: english_text,
        urdu: urdu_text,
        source: "AlQuran.cloud".to_string(),
    })
}

pub fn fetch_ayah(client: &Client, base: &str) -> Result<DailyItem, FetchError> {
    let number = rand::thread_rng().gen_range(1..=AYAH_COUNT);

    let url = format!(
        "{}/ayah/{}/editions/quran-uthmani,en.asad,ur.jalandhry",
        base, number
    );
    if let Some(item) = fetch_json(client, &url)
        .ok()
        .and_then(|payload| parse_ayah_editions(&payload))
    {
        return Ok(item);
    }

    // Some deployments only answer single-edition requests.
    let arabic = fetch_json(client, &format!("{}/ayah/{}/quran-uthmani", base, number))?;
    let english = fetch_json(client, &format!("{}/ayah/{}/en.asad", base, number))?;
    let urdu = fetch_json(client, &format!("{}/ayah/{}/ur.jalandhry", base, number))
        .unwrap_or(Value::Null);

    parse_ayah_singles(&arabic, &english, &urdu).ok_or(FetchError::Incomplete)
}

const HADITH_PATHS: [&str; 3] = ["/hadiths", "/hadith", "/books"];

/// The credential parameter name and the pagination flag both vary between
/// deployments of the hadith API.
fn hadith_query_shapes(api_key: &str, page: u32) -> Vec<Vec<(&'static str, String)>> {
    vec![
        vec![
            ("apiKey", api_key.to_string()),
            ("paginate", "1".to_string()),
            ("page", page.to_string()),
        ],
        vec![
            ("api_key", api_key.to_string()),
            ("paginate", "1".to_string()),
            ("page", page.to_string()),
        ],
        vec![("apiKey", api_key.to_string()), ("page", page.to_string())],
        vec![("api_key", api_key.to_string()), ("page", page.to_string())],
    ]
}

fn hadith_source_label(chosen: &Value) -> String {
    let mut source = first_non_empty(chosen, &["bookName", "collection", "source", "chapterEnglish"]);
    if source.is_none() {
        if let Some(book) = chosen.get("book") {
            source = first_non_empty(book, &["bookName", "writerName", "bookSlug"]);
        }
    }

    let mut label = source
        .or_else(|| first_non_empty(chosen, &["bookSlug"]))
        .unwrap_or_else(|| "Hadith API".to_string());

    if let Some(number) =
        first_non_empty(chosen, &["hadithNumber", "hadith_number", "number", "hadithNo"])
    {
        label = format!("{} #{}", label, number);
    }
    label
}

fn parse_hadith_payload(payload: &Value) -> Option<DailyItem> {
    let data = payload
        .get("hadiths")
        .or_else(|| payload.get("data"))
        .or_else(|| payload.get("hadith"))?;

    // The envelope is either a plain list, an object wrapping a `data` list,
    // or a single entry.
    let entries: Vec<&Value> = match data {
        Value::Array(list) => list.iter().collect(),
        Value::Object(map) => match map.get("data") {
            Some(Value::Array(list)) => list.iter().collect(),
            _ => vec![data],
        },
        _ => return None,
    };
    let entries: Vec<&Value> = entries.into_iter().filter(|e| e.is_object()).collect();
    if entries.is_empty() {
        return None;
    }

    let chosen = entries[rand::thread_rng().gen_range(0..entries.len())];

    let english = first_non_empty(
        chosen,
        &["hadithEnglish", "hadith_english", "englishNarrator", "text", "text_en"],
    )?;
    let arabic = first_non_empty(
        chosen,
        &["hadithArabic", "hadith_ar", "arabic", "text_ar", "hadithArabicText"],
    )?;
    let urdu = first_non_empty(chosen, &["hadithUrdu", "hadith_urdu", "text_ur"])?;

    Some(DailyItem {
        reference: hadith_source_label(chosen),
        arabic,
        english,
        urdu,
        source: "HadithAPI".to_string(),
    })
}

pub fn fetch_hadith(client: &Client, base: &str, api_key: &str) -> Result<DailyItem, FetchError> {
    if api_key.is_empty() {
        return Err(FetchError::Incomplete);
    }

    let page = rand::thread_rng().gen_range(1..=40_000u32);
    for path in HADITH_PATHS {
        for query in hadith_query_shapes(api_key, page) {
            let url = format!("{}{}", base, path);
            let payload = match fetch_json_with_query(client, &url, &query) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(url = %url, error = %err, "hadith request failed, trying next shape");
                    continue;
                }
            };
            if let Some(item) = parse_hadith_payload(&payload) {
                return Ok(item);
            }
        }
    }

    Err(FetchError::Incomplete)
}

fn ayah_card(client: &Client, base: &str) -> DailyItem {
    match fetch_ayah(client, base) {
        Ok(item) => item,
        Err(err) => {
            warn!(error = %err, "ayah fetch failed, using curated backup");
            fallback_ayah()
        }
    }
}

fn hadith_card(client: &Client, base: &str, api_key: &str) -> DailyItem {
    match fetch_hadith(client, base, api_key) {
        Ok(item) => item,
        Err(err) => {
            warn!(error = %err, "hadith fetch failed, using curated backup");
            fallback_hadith()
        }
    }
}

pub fn load_cards(client: &Client) -> DailyCards {
    DailyCards {
        ayah: ayah_card(client, AYAH_API_BASE),
        hadith: hadith_card(client, &hadith_api_base(), &hadith_api_key()),
        loaded_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
    }
}
