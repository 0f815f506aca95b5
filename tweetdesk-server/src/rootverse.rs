//! Rootverse character metadata layered over inscription rows.

use tweetdesk_types::{InscriptionRecord, InscriptionView};

use crate::lookups::PfpIndex;

/// Race a subrace belongs to, or `""` for subraces outside the lore table.
pub fn race_for(subrace: &str) -> &'static str {
    match subrace {
        "Cultivator" | "Techie" | "Warrior" | "Mage" => "Human",
        "Winged" | "Nightshade" | "Pyronians" | "Frostborn" | "DragonBlood" | "Abyssian"
        | "StarTraveler" | "Thunder" | "Forestian" | "SoulBinder" => "Humanoid",
        "Succubus" | "Asura" => "Demon",
        "Zombie" | "Skeleton" => "UnderWorld",
        "MaleGod" | "Goddess" | "DivineWarrior" => "Deity",
        "Loong" => "DivineBeast",
        _ => "",
    }
}

pub fn to_view(record: InscriptionRecord, pfp: &PfpIndex) -> InscriptionView {
    let race = record.subrace.as_deref().map(race_for).unwrap_or_default();
    InscriptionView {
        url: pfp.url_or_empty(&record.number.to_string()),
        race: race.to_string(),
        number: record.number,
        count: record.count,
        subrace: record.subrace,
        inscription: record.inscription,
        wallet: record.wallet,
        content: record.content,
    }
}

/// Stored image URL, else the PFP table entry for the inscription number.
pub fn image_url(record: &InscriptionRecord, pfp: &PfpIndex) -> Option<String> {
    record
        .image_url
        .clone()
        .or_else(|| pfp.url_for(&record.number.to_string()).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookups::CsvTable;

    fn pfp() -> PfpIndex {
        let csv = "number,url\n7,https://img/7.png\n";
        PfpIndex::from_table(CsvTable::from_reader(csv.as_bytes(), "pfp.csv").unwrap()).unwrap()
    }

    fn record(number: i64, subrace: Option<&str>, image_url: Option<&str>) -> InscriptionRecord {
        InscriptionRecord {
            number,
            count: 2,
            subrace: subrace.map(str::to_string),
            inscription: Some("abci0".to_string()),
            wallet: Some("bc1q".to_string()),
            content: None,
            image_url: image_url.map(str::to_string),
        }
    }

    #[test]
    fn test_race_for_known_and_unknown() {
        assert_eq!(race_for("Mage"), "Human");
        assert_eq!(race_for("Loong"), "DivineBeast");
        assert_eq!(race_for("Goddess"), "Deity");
        assert_eq!(race_for("mage"), "");
        assert_eq!(race_for("Dwarf"), "");
    }

    #[test]
    fn test_view_adds_race_and_url() {
        let view = to_view(record(7, Some("Zombie"), None), &pfp());
        assert_eq!(view.race, "UnderWorld");
        assert_eq!(view.url, "https://img/7.png");

        let unknown = to_view(record(8, None, None), &pfp());
        assert_eq!(unknown.race, "");
        assert_eq!(unknown.url, "");
    }

    #[test]
    fn test_image_url_prefers_stored_value() {
        assert_eq!(
            image_url(&record(7, None, Some("https://stored/7.png")), &pfp()).as_deref(),
            Some("https://stored/7.png")
        );
        assert_eq!(image_url(&record(7, None, None), &pfp()).as_deref(), Some("https://img/7.png"));
        assert_eq!(image_url(&record(9, None, None), &pfp()), None);
    }
}
