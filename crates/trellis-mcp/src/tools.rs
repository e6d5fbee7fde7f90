//! MCP tool definitions

use serde::Serialize;
use serde_json::json;

/// MCP tool definition
#[derive(Debug, Serialize)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn relation_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["from", "to", "relationType"],
        "properties": {
            "from": {"type": "string", "description": "Source entity name"},
            "to": {"type": "string", "description": "Target entity name"},
            "relationType": {"type": "string", "description": "Relation type (calls, uses, implements, inherits, imports, contains)"}
        }
    })
}

fn entity_types_schema() -> serde_json::Value {
    json!({"type": "array", "items": {"type": "string"}, "description": "Only include entities of these types"})
}

/// Get all available tools
pub fn get_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "create_entities",
            description: "Create entities with observations. Entities whose name already exists are skipped.",
            input_schema: json!({
                "type": "object",
                "required": ["entities"],
                "properties": {
                    "entities": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "entityType"],
                            "properties": {
                                "name": {"type": "string", "description": "Unique entity name"},
                                "entityType": {"type": "string", "description": "Entity type (class, function, method, file, module)"},
                                "observations": {"type": "array", "items": {"type": "string"}, "description": "Facts such as 'Defined in: src/app.py' or 'Line: 12'"}
                            }
                        }
                    }
                }
            }),
        },
        Tool {
            name: "create_relations",
            description: "Create relations between entities. Existing relations are skipped.",
            input_schema: json!({
                "type": "object",
                "required": ["relations"],
                "properties": {
                    "relations": {"type": "array", "items": relation_schema()}
                }
            }),
        },
        Tool {
            name: "add_observations",
            description: "Append observations to existing entities. Fails if any entity does not exist.",
            input_schema: json!({
                "type": "object",
                "required": ["observations"],
                "properties": {
                    "observations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["entityName", "contents"],
                            "properties": {
                                "entityName": {"type": "string", "description": "Exact name of an existing entity"},
                                "contents": {"type": "array", "items": {"type": "string"}, "description": "Observations to append"}
                            }
                        }
                    }
                }
            }),
        },
        Tool {
            name: "delete_entities",
            description: "Delete entities and every relation that touches them.",
            input_schema: json!({
                "type": "object",
                "required": ["entityNames"],
                "properties": {
                    "entityNames": {"type": "array", "items": {"type": "string"}}
                }
            }),
        },
        Tool {
            name: "delete_observations",
            description: "Remove specific observations from entities.",
            input_schema: json!({
                "type": "object",
                "required": ["deletions"],
                "properties": {
                    "deletions": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["entityName", "observations"],
                            "properties": {
                                "entityName": {"type": "string"},
                                "observations": {"type": "array", "items": {"type": "string"}}
                            }
                        }
                    }
                }
            }),
        },
        Tool {
            name: "delete_relations",
            description: "Delete specific relations.",
            input_schema: json!({
                "type": "object",
                "required": ["relations"],
                "properties": {
                    "relations": {"type": "array", "items": relation_schema()}
                }
            }),
        },
        Tool {
            name: "read_graph",
            description: "Read the knowledge graph within the token budget. 'smart' (default) returns a prioritized overview: summary, file structure, API surface, dependencies and key relations. 'entities' and 'relationships' return filtered lists; 'raw' returns everything or an explanation when it does not fit.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "mode": {"type": "string", "enum": ["smart", "entities", "relationships", "raw"], "default": "smart"},
                    "entityTypes": entity_types_schema(),
                    "limit": {"type": "number", "description": "Maximum number of items in entities/relationships mode (default: 50)"}
                }
            }),
        },
        Tool {
            name: "search_similar",
            description: "Semantic search over entities and relations.",
            input_schema: json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {"type": "string", "description": "Natural language query"},
                    "entityTypes": entity_types_schema(),
                    "limit": {"type": "number", "description": "Maximum number of hits (default: 10)"}
                }
            }),
        },
    ]
}
