use crate::Value;

/// Parses a JSON fixture.
pub fn jv(text: &str) -> Value {
    crate::from_json_text(text).expect("valid JSON fixture")
}

pub const INPUT_JSON: &str = r#"
{
    "name": {"first": "Tom", "last": "Anderson"},
    "age": 37,
    "children": ["Sara", "Alex", "Jack"],
    "fav.movie": "Deer Hunter",
    "friends": [
        {"first": "Dale", "last": "Murphy", "age": 44, "nets": ["ig", "fb", "tw"]},
        {"first": "Roger", "last": "Craig", "age": 68, "nets": ["fb", "tw"]},
        {"first": "Jane", "last": "Murphy", "age": 47, "nets": ["ig", "tw"]}
    ]
}
"#;

pub const INPUT_LIST: &str = r#"
[
    {"first": "Dale"},
    {"first": "Jane"},
    {"last": "Murphy"}
]
"#;

pub const INPUT_ESCAPE: &str = r#"
{
    "test": {
        "*": "valZ",
        "*v": "val0",
        "keyv*": "val1",
        "key*v": "val2",
        "keyv?": "val3",
        "key?v": "val4",
        "keyv.": "val5",
        "key.v": "val6",
        "keyk*": {"key?": "val7"}
    }
}
"#;

pub const INPUT_BASIC: &str = r#"
{
    "age": 100, "name2": {"here": "B\\\"R"},
    "noop": {"what is a wren?": "a bird"},
    "happy": true, "immortal": false,
    "items": [1, 2, 3, {"tags": [1, 2, 3], "points": [[1, 2], [3, 4]]}, 4, 5, 6, 7],
    "arr": ["1", 2, "3", {"hello": "world"}, "4", 5],
    "vals": [1, 2, 3], "name": {"first": "tom", "last": null},
    "created": "2014-05-16T08:28:06.989Z",
    "loggy": {
        "programmers": [
            {"firstName": "Brett", "lastName": "McLaughlin", "email": "aaaa", "tag": "good"},
            {"firstName": "Jason", "lastName": "Hunter", "email": "bbbb", "tag": "bad"},
            {"firstName": "Elliotte", "lastName": "Harold", "email": "cccc", "tag": "good"},
            {"firstName": 1002.3, "age": 101}
        ]
    },
    "lastly": {"end...ing": "soon", "yay": "final"}
}
"#;
