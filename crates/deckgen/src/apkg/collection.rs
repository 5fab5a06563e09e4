//! Collection database layout (Anki schema version 11).

use serde_json::{Value, json};

use crate::deck::{Deck, NoteModel};

/// Separator between note fields in the `flds` column.
pub const FIELD_SEPARATOR: &str = "\x1f";

/// Tables and indexes an importer expects to find.
pub const SCHEMA: &str = "
CREATE TABLE col (
    id integer primary key, crt integer not null, mod integer not null,
    scm integer not null, ver integer not null, dty integer not null,
    usn integer not null, ls integer not null, conf text not null,
    models text not null, decks text not null, dconf text not null,
    tags text not null
);
CREATE TABLE notes (
    id integer primary key, guid text not null, mid integer not null,
    mod integer not null, usn integer not null, tags text not null,
    flds text not null, sfld integer not null, csum integer not null,
    flags integer not null, data text not null
);
CREATE TABLE cards (
    id integer primary key, nid integer not null, did integer not null,
    ord integer not null, mod integer not null, usn integer not null,
    type integer not null, queue integer not null, due integer not null,
    ivl integer not null, factor integer not null, reps integer not null,
    lapses integer not null, left integer not null, odue integer not null,
    odid integer not null, flags integer not null, data text not null
);
CREATE TABLE revlog (
    id integer primary key, cid integer not null, usn integer not null,
    ease integer not null, ivl integer not null, lastIvl integer not null,
    factor integer not null, time integer not null, type integer not null
);
CREATE TABLE graves (usn integer not null, oid integer not null, type integer not null);
CREATE INDEX ix_notes_usn ON notes (usn);
CREATE INDEX ix_cards_usn ON cards (usn);
CREATE INDEX ix_revlog_usn ON revlog (usn);
CREATE INDEX ix_cards_nid ON cards (nid);
CREATE INDEX ix_cards_sched ON cards (did, queue, due);
CREATE INDEX ix_revlog_cid ON revlog (cid);
CREATE INDEX ix_notes_csum ON notes (csum);
";

const LATEX_PRE: &str = "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n";

/// Collection-wide settings (`col.conf`).
pub fn collection_conf(deck_id: i64, model_id: i64) -> Value {
    json!({
        "activeDecks": [deck_id],
        "curDeck": deck_id,
        "curModel": model_id.to_string(),
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true
    })
}

/// Default deck options group (`col.dconf`).
pub fn deck_options() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "perDay": 100,
                "hardFactor": 1.2
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0
            }
        }
    })
}

/// Note type map (`col.models`) holding the single vocabulary model.
pub fn models(model: &NoteModel, deck_id: i64, now: i64) -> Value {
    let fields: Vec<Value> = model
        .fields
        .iter()
        .enumerate()
        .map(|(ord, name)| {
            json!({
                "name": name,
                "ord": ord,
                "sticky": false,
                "rtl": false,
                "font": "Arial",
                "size": 20,
                "media": []
            })
        })
        .collect();

    let template = json!({
        "name": model.template_name,
        "ord": 0,
        "qfmt": model.front,
        "afmt": model.back,
        "bqfmt": "",
        "bafmt": "",
        "did": null,
        "bfont": "",
        "bsize": 0
    });

    json!({
        model.id.to_string(): {
            "id": model.id,
            "name": model.name,
            "type": 0,
            "mod": now,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "tmpls": [template],
            "flds": fields,
            "css": model.css,
            "latexPre": LATEX_PRE,
            "latexPost": "\\end{document}",
            "latexsvg": false,
            // the front shows only the source field
            "req": [[0, "any", [0]]],
            "tags": [],
            "vers": []
        }
    })
}

/// Deck map (`col.decks`): Anki's built-in default deck plus ours.
pub fn decks(deck: &Deck, now: i64) -> Value {
    json!({
        "1": deck_entry(1, "Default", now),
        deck.id.to_string(): deck_entry(deck.id, &deck.name, now),
    })
}

fn deck_entry(id: i64, name: &str, now: i64) -> Value {
    json!({
        "id": id,
        "mod": now,
        "name": name,
        "usn": -1,
        "lrnToday": [0, 0],
        "revToday": [0, 0],
        "newToday": [0, 0],
        "timeToday": [0, 0],
        "collapsed": false,
        "browserCollapsed": false,
        "desc": "",
        "dyn": 0,
        "conf": 1,
        "extendNew": 10,
        "extendRev": 50
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_keyed_by_id() {
        let model = NoteModel::new(42, "English", "Italian");
        let value = models(&model, 7, 0);
        let entry = &value["42"];
        assert_eq!(entry["name"], "Model with Audio and Small Image");
        assert_eq!(entry["flds"].as_array().unwrap().len(), 4);
        assert_eq!(entry["tmpls"][0]["qfmt"], "{{English}}");
        assert_eq!(entry["did"], 7);
    }

    #[test]
    fn test_decks_include_default() {
        let deck = Deck::new("Italian", 99, NoteModel::new(1, "A", "B"));
        let value = decks(&deck, 0);
        assert_eq!(value["1"]["name"], "Default");
        assert_eq!(value["99"]["name"], "Italian");
    }
}
