//! Sample document for trying out text search on an empty store.

/// Paragraphs about Batman, separated by blank lines.
pub const SAMPLE_TEXT: &str = "\
Batman is a superhero who appears in American comic books published by DC Comics. Batman was created by artist Bob Kane and writer Bill Finger, and debuted in the 27th issue of the comic book Detective Comics on March 30, 1939.

In the DC Universe, Batman is the alias of Bruce Wayne, a wealthy American playboy, philanthropist, and industrialist who resides in Gotham City. He trains himself physically and intellectually, crafts a bat-inspired persona, and monitors the Gotham streets at night.

Batman operates in the fictional Gotham City with assistance from various supporting characters, including his butler Alfred, police commissioner James Gordon, and vigilante allies such as Robin. Unlike most superheroes, Batman does not possess any superpowers, instead relying on his intellect, fighting skills, and wealth.

The Batcave serves as Batman's secret headquarters and command center. Located beneath Wayne Manor, it houses his crime-fighting equipment, trophies from past cases, and computer systems used to monitor Gotham City and coordinate with allies.

Batman's rogues gallery is considered one of the best in comics, including iconic villains like the Joker, Penguin, Riddler, Two-Face, and Catwoman. These adversaries often mirror aspects of Batman's own psyche and provide psychological depth to his stories.

Batman's no-kill rule is a fundamental aspect of his character. Despite the trauma and darkness he faces, he refuses to use lethal force, believing that crossing that line would make him no better than the criminals he fights.

The Bat-Signal is a distress signal device that appears in the sky over Gotham City, summoning Batman to action. It's typically used by Police Commissioner James Gordon to alert Batman to emergencies requiring his assistance.

Wayne Enterprises is the multinational conglomerate run by Bruce Wayne. It provides the financial resources and technological innovations that fuel Batman's crime-fighting activities while serving as Bruce Wayne's public persona.";

#[cfg(test)]
mod sample_test {
    use super::*;
    use crate::embed::{HashEmbedder, add_document, result_text, search_text, split_paragraphs};
    use crate::{DotDB, MemoryBackend};

    #[test]
    fn test_sample_splits_into_paragraphs() {
        let paragraphs = split_paragraphs(SAMPLE_TEXT);
        assert_eq!(paragraphs.len(), 8);
        assert!(paragraphs.iter().all(|p| !p.contains("\n\n")));
    }

    #[tokio::test]
    async fn test_sample_is_searchable() {
        let embedder = HashEmbedder::new(384).unwrap();
        let mut db = DotDB::new(384, MemoryBackend::new()).unwrap();
        db.connect("sample").await.unwrap();
        add_document(&mut db, &embedder, SAMPLE_TEXT).await.unwrap();
        assert_eq!(db.count(), 8);

        let results = search_text(&db, &embedder, "Batcave headquarters beneath Wayne Manor", 1).unwrap();
        assert!(result_text(&results[0]).starts_with("The Batcave"));
    }
}
