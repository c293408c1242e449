//! Canned incident checklists and meet links.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

pub const MEET_URL_PREFIX: &str = "g.co/meet/";

const FIRE_TEAM: &str = "<!subteam^S01DXD4HKCH>";
const FIRE_CHANNEL: &str = "<#C01DFMK1F4M>";
const ANNOUNCEMENTS_CHANNEL: &str = "<#C024FV14Z>";

const ADVERBS: &[&str] = &[
    "boldly", "briskly", "calmly", "deftly", "eagerly", "gladly", "gently", "keenly", "kindly",
    "merrily", "neatly", "nobly", "quickly", "quietly", "rapidly", "simply", "smoothly",
    "steadily", "surely", "swiftly", "truly", "warmly", "wisely",
];

const ADJECTIVES: &[&str] = &[
    "amber", "bright", "clever", "cosmic", "daring", "fancy", "fluent", "golden", "happy",
    "honest", "jolly", "lively", "lucky", "mellow", "nimble", "polite", "proud", "quiet", "rosy",
    "sharp", "sunny", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "beetle", "condor", "crane", "dingo", "eagle", "falcon", "ferret", "gecko", "heron",
    "ibex", "koala", "lemur", "llama", "marmot", "newt", "otter", "panda", "quail", "raven",
    "salmon", "tapir", "walrus", "yak",
];

/// Meet link for a requested name; a blank name gets a random one.
pub fn meet_link(name: &str) -> String {
    meet_link_with(name, &mut rand::thread_rng())
}

pub fn meet_link_with<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    let trimmed = name.trim();
    let slug = if trimmed.is_empty() { random_meet_name(rng) } else { trimmed.replace(' ', "-") };
    format!("{MEET_URL_PREFIX}{slug}")
}

/// Three hyphenated words, adverb-adjective-noun.
pub fn random_meet_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    [ADVERBS, ADJECTIVES, NOUNS]
        .iter()
        .filter_map(|words| words.choose(&mut *rng))
        .copied()
        .collect::<Vec<_>>()
        .join("-")
}

pub fn fire_meet_name(now: DateTime<Utc>) -> String {
    format!("fire-investigation-{}", now.format("%Y-%m-%d-%H-%M"))
}

pub fn fire_checklist(folder_id: &str, now: DateTime<Utc>) -> String {
    let meet = meet_link(&fire_meet_name(now));
    format!(
        "1. Assemble the {FIRE_TEAM} in the {FIRE_CHANNEL} channel\n\
         2. Designate fire leader, document maintainer, announcements updater\n\
         3. Fire doc maintainer creates a new doc here: <https://drive.google.com/drive/folders/{folder_id}>\n\
         4. Post link to the fire doc\n\
         5. If a real fire - announcer posts to the {ANNOUNCEMENTS_CHANNEL} channel \"There is a fire and engineering is investigating, updates will be posted in a thread on this message\"\n\
         6. Post a link to the fire document in the {ANNOUNCEMENTS_CHANNEL} channel thread\n\
         7. Fight! {meet}\n\n\n\
         8. Use `/firedown` when the fire is out\n"
    )
}

pub fn firedown_checklist() -> String {
    format!(
        "1. Ask if there are any cleanup tasks to do\n\
         2. Update the {ANNOUNCEMENTS_CHANNEL}  channel\n\
         3. If applicable, schedule a blameless post mortem\n"
    )
}
