use crate::HarnessError;
use crate::candidate::{Candidate, Invocation, InvocationResult};
use crate::wire::{InvocationRequest, InvocationResponse};
use pzl_sandbox::{DEFAULT_TIMEOUT, ProcessOutcome, ProgramSpec, RuntimeCommand, SandboxError, clamp_timeout, excerpt, run_program};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

const STDERR_EXCERPT_CHARS: usize = 500;
const STDOUT_EXCERPT_CHARS: usize = 200;

const PY_PRELUDE: &str = r#"
import bisect, collections, functools, heapq, itertools, math, random, re, string
from collections import Counter, OrderedDict, defaultdict, deque
from functools import lru_cache
from heapq import heapify, heappop, heappush
from typing import *
import json as _pzl_json
import sys as _pzl_sys

class ListNode:
    def __init__(self, val=0, next=None):
        self.val = val
        self.next = next

class TreeNode:
    def __init__(self, val=0, left=None, right=None):
        self.val = val
        self.left = left
        self.right = right

class Node:
    def __init__(self, val=0, neighbors=None):
        self.val = val
        self.neighbors = neighbors if neighbors is not None else []
        self.next = None
        self.random = None

class RandomNode:
    def __init__(self, val=0, next=None, random=None):
        self.val = val
        self.next = next
        self.random = random
"#;

const PY_MAIN: &str = r#"
def _pzl_list_from(values):
    head = None
    for val in reversed(values or []):
        node = ListNode(val)
        node.next = head
        head = node
    return head

def _pzl_list_to(head):
    out, seen = [], set()
    while head is not None:
        if id(head) in seen:
            raise ValueError("cycle in returned linked list")
        seen.add(id(head))
        out.append(head.val)
        head = head.next
    return out

def _pzl_cyclic_from(values, pos):
    nodes = [ListNode(val) for val in values or []]
    for left, right in zip(nodes, nodes[1:]):
        left.next = right
    if nodes and pos is not None and pos >= 0:
        nodes[-1].next = nodes[pos]
    return nodes[0] if nodes else None

def _pzl_cyclic_to(head):
    out, index = [], {}
    while head is not None and id(head) not in index:
        index[id(head)] = len(out)
        out.append(head.val)
        head = head.next
    return out, (index[id(head)] if head is not None else -1)

def _pzl_tree_from(values):
    values = values or []
    if not values or values[0] is None:
        return None
    root = TreeNode(values[0])
    queue = deque([root])
    i = 1
    while queue and i < len(values):
        node = queue.popleft()
        if i < len(values) and values[i] is not None:
            node.left = TreeNode(values[i])
            queue.append(node.left)
        i += 1
        if i < len(values) and values[i] is not None:
            node.right = TreeNode(values[i])
            queue.append(node.right)
        i += 1
    return root

def _pzl_tree_to(root):
    out, queue, seen = [], deque([root]), set()
    while queue:
        node = queue.popleft()
        if node is None:
            out.append(None)
            continue
        if id(node) in seen:
            raise ValueError("cycle in returned tree")
        seen.add(id(node))
        out.append(node.val)
        queue.append(node.left)
        queue.append(node.right)
    while out and out[-1] is None:
        out.pop()
    return out

def _pzl_find(root, target):
    stack = [root]
    while stack:
        node = stack.pop()
        if node is None:
            continue
        if node.val == target:
            return node
        stack.append(node.right)
        stack.append(node.left)
    return None

def _pzl_graph_from(adjacency):
    if not adjacency:
        return None
    nodes = [Node(i + 1) for i in range(len(adjacency))]
    for node, ids in zip(nodes, adjacency):
        node.neighbors = [nodes[j - 1] for j in ids]
    return nodes[0]

def _pzl_graph_to(entry):
    if entry is None:
        return []
    seen, queue = {id(entry): entry}, deque([entry])
    while queue:
        node = queue.popleft()
        for neighbor in node.neighbors:
            if id(neighbor) not in seen:
                seen[id(neighbor)] = neighbor
                queue.append(neighbor)
    ordered = sorted(seen.values(), key=lambda node: node.val)
    return [sorted(neighbor.val for neighbor in node.neighbors) for node in ordered]

def _pzl_random_from(entries):
    entries = entries or []
    nodes = [RandomNode(entry[0]) for entry in entries]
    for left, right in zip(nodes, nodes[1:]):
        left.next = right
    for node, entry in zip(nodes, entries):
        node.random = nodes[entry[1]] if entry[1] is not None else None
    return nodes[0] if nodes else None

def _pzl_random_to(head):
    order, index = [], {}
    while head is not None:
        if id(head) in index:
            raise ValueError("cycle in returned random list")
        index[id(head)] = len(order)
        order.append(head)
        head = head.next
    out = []
    for node in order:
        target = getattr(node, "random", None)
        if target is not None and id(target) not in index:
            raise ValueError("random pointer leaves the list")
        out.append([node.val, index[id(target)] if target is not None else None])
    return out

def _pzl_decode(wire, decoded):
    kind = wire["kind"]
    if kind == "value":
        return wire.get("value")
    if kind == "list":
        return _pzl_list_from(wire["values"])
    if kind == "list_seq":
        return [_pzl_list_from(values) for values in wire["lists"] or []]
    if kind == "cyclic_list":
        return _pzl_cyclic_from(wire["values"], wire["pos"])
    if kind == "random_list":
        return _pzl_random_from(wire["nodes"])
    if kind == "tree":
        return _pzl_tree_from(wire["level_order"])
    if kind == "tree_node":
        return _pzl_find(decoded[wire["tree_arg"]], wire["value"])
    if kind == "graph":
        return _pzl_graph_from(wire["adjacency"])
    if kind == "unit":
        return None
    raise ValueError("unknown wire kind %r" % kind)

def _pzl_encode_as(kind, value):
    if kind == "list":
        return {"kind": "list", "values": _pzl_list_to(value)}
    if kind == "cyclic_list":
        values, pos = _pzl_cyclic_to(value)
        return {"kind": "cyclic_list", "values": values, "pos": pos}
    if kind == "tree":
        return {"kind": "tree", "level_order": _pzl_tree_to(value)}
    if kind == "graph":
        return {"kind": "graph", "adjacency": _pzl_graph_to(value)}
    if kind == "random_list":
        return {"kind": "random_list", "nodes": _pzl_random_to(value)}
    if kind == "list_seq":
        return {"kind": "list_seq", "lists": [_pzl_list_to(head) for head in value or []]}
    return {"kind": "value", "value": value}

_PZL_OUTPUT_KINDS = {
    "linked_list": "list",
    "cyclic_list": "cyclic_list",
    "tree": "tree",
    "graph": "graph",
    "random_pointer_list": "random_list",
}

def _pzl_encode_output(output, result):
    if output == "in_place":
        return {"kind": "unit"}
    if output == "tree_node_value":
        return {"kind": "value", "value": None if result is None else result.val}
    return _pzl_encode_as(_PZL_OUTPUT_KINDS.get(output, "value"), result)

def _pzl_resolve(name):
    target = globals().get(name)
    if target is not None:
        return target
    holder = globals().get("Solution")
    if holder is not None and hasattr(holder, name):
        return getattr(holder(), name)
    raise NameError("entry point %r is not defined" % name)

def _pzl_pair(first, second):
    scope = globals()
    if first in scope and second in scope:
        return scope[first], scope[second]
    for holder_name in ("Codec", "Solution"):
        holder = scope.get(holder_name)
        if holder is not None and hasattr(holder, first) and hasattr(holder, second):
            instance = holder()
            return getattr(instance, first), getattr(instance, second)
    raise NameError("%s/%s pair is not defined" % (first, second))

def _pzl_run(request):
    call = request["call"]
    mode = call["mode"]
    if mode == "function":
        decoded = []
        for wire in call["args"]:
            decoded.append(_pzl_decode(wire, decoded))
        result = _pzl_resolve(call["entry_point"])(*decoded)
        response = {"status": "ok", "result": _pzl_encode_output(call["output"], result)}
        if call["output"] == "in_place" and decoded:
            response["first_arg_after"] = _pzl_encode_as(call["args"][0]["kind"], decoded[0])
        return response
    if mode == "stateful":
        cls = _pzl_resolve(call["class_name"])
        methods, arguments = call["methods"], call["arguments"]
        instance = cls(*arguments[0])
        results = [None]
        for method, args in zip(methods[1:], arguments[1:]):
            results.append(getattr(instance, method)(*args))
        return {"status": "ok", "result": {"kind": "value", "value": results}}
    if mode == "round_trip":
        payload = _pzl_decode(call["payload"], [])
        if call["kind"] == "encode_decode":
            encode, decode = _pzl_pair("encode", "decode")
            return {"status": "ok", "result": {"kind": "value", "value": decode(encode(payload))}}
        serialize, deserialize = _pzl_pair("serialize", "deserialize")
        restored = deserialize(serialize(payload))
        return {"status": "ok", "result": {"kind": "tree", "level_order": _pzl_tree_to(restored)}}
    raise ValueError("unknown call mode %r" % mode)

def _pzl_main():
    request = _pzl_json.loads(_pzl_sys.stdin.read())
    real_stdout = _pzl_sys.stdout
    _pzl_sys.stdout = _pzl_sys.stderr
    try:
        line = _pzl_json.dumps(_pzl_run(request))
    except Exception as exc:
        line = _pzl_json.dumps({"status": "error", "message": "%s: %s" % (type(exc).__name__, exc)})
    finally:
        _pzl_sys.stdout = real_stdout
    _pzl_sys.stdout.write(line + "\n")
    _pzl_sys.stdout.flush()

_pzl_sys.setrecursionlimit(10000)
_pzl_main()
"#;

// Assigned on globalThis so a solution that declares its own ListNode or
// TreeNode class shadows these instead of colliding with them.
const JS_PRELUDE: &str = r#"
globalThis.ListNode = class ListNode {
    constructor(val, next) {
        this.val = val === undefined ? 0 : val;
        this.next = next === undefined ? null : next;
    }
};
globalThis.TreeNode = class TreeNode {
    constructor(val, left, right) {
        this.val = val === undefined ? 0 : val;
        this.left = left === undefined ? null : left;
        this.right = right === undefined ? null : right;
    }
};
globalThis.Node = class Node {
    constructor(val, neighbors) {
        this.val = val === undefined ? 0 : val;
        this.neighbors = neighbors === undefined ? [] : neighbors;
        this.next = null;
        this.random = null;
    }
};
globalThis.RandomNode = class RandomNode {
    constructor(val, next, random) {
        this.val = val === undefined ? 0 : val;
        this.next = next === undefined ? null : next;
        this.random = random === undefined ? null : random;
    }
};
"#;

const JS_MAIN: &str = r#"
const __pzlListFrom = (values) => {
    let head = null;
    for (const val of [...(values || [])].reverse()) {
        head = new ListNode(val, head);
    }
    return head;
};

const __pzlListTo = (head) => {
    const out = [];
    const seen = new Set();
    while (head) {
        if (seen.has(head)) throw new Error('cycle in returned linked list');
        seen.add(head);
        out.push(head.val);
        head = head.next;
    }
    return out;
};

const __pzlCyclicFrom = (values, pos) => {
    const nodes = (values || []).map((val) => new ListNode(val));
    for (let i = 0; i + 1 < nodes.length; i++) nodes[i].next = nodes[i + 1];
    if (nodes.length && pos !== null && pos >= 0) nodes[nodes.length - 1].next = nodes[pos];
    return nodes.length ? nodes[0] : null;
};

const __pzlCyclicTo = (head) => {
    const out = [];
    const index = new Map();
    while (head && !index.has(head)) {
        index.set(head, out.length);
        out.push(head.val);
        head = head.next;
    }
    return [out, head ? index.get(head) : -1];
};

const __pzlTreeFrom = (values) => {
    values = values || [];
    if (!values.length || values[0] === null) return null;
    const root = new TreeNode(values[0]);
    const queue = [root];
    let i = 1;
    while (queue.length && i < values.length) {
        const node = queue.shift();
        if (i < values.length && values[i] !== null) {
            node.left = new TreeNode(values[i]);
            queue.push(node.left);
        }
        i++;
        if (i < values.length && values[i] !== null) {
            node.right = new TreeNode(values[i]);
            queue.push(node.right);
        }
        i++;
    }
    return root;
};

const __pzlTreeTo = (root) => {
    const out = [];
    const queue = [root];
    const seen = new Set();
    while (queue.length) {
        const node = queue.shift();
        if (!node) {
            out.push(null);
            continue;
        }
        if (seen.has(node)) throw new Error('cycle in returned tree');
        seen.add(node);
        out.push(node.val);
        queue.push(node.left || null);
        queue.push(node.right || null);
    }
    while (out.length && out[out.length - 1] === null) out.pop();
    return out;
};

const __pzlFind = (root, target) => {
    const stack = [root];
    while (stack.length) {
        const node = stack.pop();
        if (!node) continue;
        if (node.val === target) return node;
        stack.push(node.right || null);
        stack.push(node.left || null);
    }
    return null;
};

const __pzlGraphFrom = (adjacency) => {
    if (!adjacency || !adjacency.length) return null;
    const nodes = adjacency.map((_, i) => new Node(i + 1));
    adjacency.forEach((ids, i) => {
        nodes[i].neighbors = ids.map((id) => nodes[id - 1]);
    });
    return nodes[0];
};

const __pzlGraphTo = (entry) => {
    if (!entry) return [];
    const seen = new Set([entry]);
    const queue = [entry];
    while (queue.length) {
        const node = queue.shift();
        for (const neighbor of node.neighbors || []) {
            if (!seen.has(neighbor)) {
                seen.add(neighbor);
                queue.push(neighbor);
            }
        }
    }
    return [...seen]
        .sort((a, b) => a.val - b.val)
        .map((node) => (node.neighbors || []).map((n) => n.val).sort((a, b) => a - b));
};

const __pzlRandomFrom = (entries) => {
    entries = entries || [];
    const nodes = entries.map((entry) => new RandomNode(entry[0]));
    for (let i = 0; i + 1 < nodes.length; i++) nodes[i].next = nodes[i + 1];
    entries.forEach((entry, i) => {
        nodes[i].random = entry[1] === null ? null : nodes[entry[1]];
    });
    return nodes.length ? nodes[0] : null;
};

const __pzlRandomTo = (head) => {
    const order = [];
    const index = new Map();
    while (head) {
        if (index.has(head)) throw new Error('cycle in returned random list');
        index.set(head, order.length);
        order.push(head);
        head = head.next;
    }
    return order.map((node) => {
        const target = node.random || null;
        if (target && !index.has(target)) throw new Error('random pointer leaves the list');
        return [node.val, target ? index.get(target) : null];
    });
};

const __pzlDecode = (wire, decoded) => {
    switch (wire.kind) {
        case 'value': return wire.value === undefined ? null : wire.value;
        case 'list': return __pzlListFrom(wire.values);
        case 'list_seq': return (wire.lists || []).map(__pzlListFrom);
        case 'cyclic_list': return __pzlCyclicFrom(wire.values, wire.pos);
        case 'random_list': return __pzlRandomFrom(wire.nodes);
        case 'tree': return __pzlTreeFrom(wire.level_order);
        case 'tree_node': return __pzlFind(decoded[wire.tree_arg], wire.value);
        case 'graph': return __pzlGraphFrom(wire.adjacency);
        case 'unit': return null;
        default: throw new Error(`unknown wire kind ${wire.kind}`);
    }
};

const __pzlEncodeAs = (kind, value) => {
    switch (kind) {
        case 'list': return { kind: 'list', values: __pzlListTo(value) };
        case 'cyclic_list': {
            const [values, pos] = __pzlCyclicTo(value);
            return { kind: 'cyclic_list', values, pos };
        }
        case 'tree': return { kind: 'tree', level_order: __pzlTreeTo(value) };
        case 'graph': return { kind: 'graph', adjacency: __pzlGraphTo(value) };
        case 'random_list': return { kind: 'random_list', nodes: __pzlRandomTo(value) };
        case 'list_seq': return { kind: 'list_seq', lists: (value || []).map(__pzlListTo) };
        default: return { kind: 'value', value: value === undefined ? null : value };
    }
};

const __PZL_OUTPUT_KINDS = {
    linked_list: 'list',
    cyclic_list: 'cyclic_list',
    tree: 'tree',
    graph: 'graph',
    random_pointer_list: 'random_list',
};

const __pzlEncodeOutput = (output, result) => {
    if (output === 'in_place') return { kind: 'unit' };
    if (output === 'tree_node_value') return { kind: 'value', value: result ? result.val : null };
    return __pzlEncodeAs(__PZL_OUTPUT_KINDS[output] || 'value', result);
};

const __pzlLookup = (name) => {
    if (!/^[A-Za-z_$][\w$]*$/.test(name)) throw new Error(`invalid identifier ${name}`);
    try {
        return eval(name);
    } catch (err) {
        return undefined;
    }
};

const __pzlResolve = (name) => {
    const target = __pzlLookup(name);
    if (target !== undefined) return target;
    const Holder = __pzlLookup('Solution');
    if (Holder && typeof Holder.prototype[name] === 'function') {
        const instance = new Holder();
        return instance[name].bind(instance);
    }
    throw new Error(`entry point ${name} is not defined`);
};

const __pzlPair = (first, second) => {
    const a = __pzlLookup(first);
    const b = __pzlLookup(second);
    if (typeof a === 'function' && typeof b === 'function') return [a, b];
    for (const holderName of ['Codec', 'Solution']) {
        const Holder = __pzlLookup(holderName);
        if (Holder && typeof Holder.prototype[first] === 'function' && typeof Holder.prototype[second] === 'function') {
            const instance = new Holder();
            return [instance[first].bind(instance), instance[second].bind(instance)];
        }
    }
    throw new Error(`${first}/${second} pair is not defined`);
};

const __pzlRun = (request) => {
    const call = request.call;
    if (call.mode === 'function') {
        const decoded = [];
        for (const wire of call.args) decoded.push(__pzlDecode(wire, decoded));
        const result = __pzlResolve(call.entry_point)(...decoded);
        const response = { status: 'ok', result: __pzlEncodeOutput(call.output, result) };
        if (call.output === 'in_place' && decoded.length) {
            response.first_arg_after = __pzlEncodeAs(call.args[0].kind, decoded[0]);
        }
        return response;
    }
    if (call.mode === 'stateful') {
        const Cls = __pzlResolve(call.class_name);
        const instance = new Cls(...call.arguments[0]);
        const results = [null];
        for (let i = 1; i < call.methods.length; i++) {
            const value = instance[call.methods[i]](...call.arguments[i]);
            results.push(value === undefined ? null : value);
        }
        return { status: 'ok', result: { kind: 'value', value: results } };
    }
    if (call.mode === 'round_trip') {
        const payload = __pzlDecode(call.payload, []);
        if (call.kind === 'encode_decode') {
            const [encode, decode] = __pzlPair('encode', 'decode');
            return { status: 'ok', result: { kind: 'value', value: decode(encode(payload)) } };
        }
        const [serialize, deserialize] = __pzlPair('serialize', 'deserialize');
        return { status: 'ok', result: { kind: 'tree', level_order: __pzlTreeTo(deserialize(serialize(payload))) } };
    }
    throw new Error(`unknown call mode ${call.mode}`);
};

(() => {
    const request = JSON.parse(require('fs').readFileSync(0, 'utf8'));
    const realLog = console.log;
    console.log = (...args) => console.error(...args);
    let line;
    try {
        line = JSON.stringify(__pzlRun(request));
    } catch (err) {
        const name = err && err.name ? err.name : 'Error';
        const message = err && err.message !== undefined ? err.message : String(err);
        line = JSON.stringify({ status: 'error', message: `${name}: ${message}` });
    } finally {
        console.log = realLog;
    }
    process.stdout.write(line + '\n');
})();
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Javascript,
}

impl Language {
    pub const ALL: [Self; 2] = [Self::Python, Self::Javascript];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Javascript => "javascript",
        }
    }

    #[must_use]
    pub fn default_runtime(self) -> RuntimeCommand {
        match self {
            Self::Python => RuntimeCommand::python(),
            Self::Javascript => RuntimeCommand::node(),
        }
    }

    /// Driver prelude, then the solution, then the driver entry point.
    #[must_use]
    pub fn compose(self, solution: &str) -> String {
        let (prelude, main) = match self {
            Self::Python => (PY_PRELUDE, PY_MAIN),
            Self::Javascript => (JS_PRELUDE, JS_MAIN),
        };
        let mut program = String::with_capacity(prelude.len() + solution.len() + main.len() + 2);
        program.push_str(prelude);
        program.push('\n');
        program.push_str(solution);
        program.push('\n');
        program.push_str(main);
        program
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" | "python3" | "py" => Ok(Self::Python),
            "javascript" | "js" | "node" => Ok(Self::Javascript),
            other => Err(format!("unsupported language `{other}`")),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A solution source executed once per invocation in a sandboxed process.
#[derive(Debug, Clone)]
pub struct ProcessCandidate {
    label: String,
    language: Language,
    runtime: RuntimeCommand,
    source: String,
    timeout: Duration,
}

impl ProcessCandidate {
    #[must_use]
    pub fn new(language: Language, source: impl Into<String>) -> Self {
        Self {
            label: language.as_str().to_string(),
            language,
            runtime: language.default_runtime(),
            source: source.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeCommand) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn runtime(&self) -> &RuntimeCommand {
        &self.runtime
    }
}

impl Candidate for ProcessCandidate {
    fn label(&self) -> &str {
        &self.label
    }

    fn invoke(&self, invocation: Invocation) -> Result<InvocationResult, HarnessError> {
        let request = InvocationRequest::from_invocation(&invocation)?;
        let stdin = serde_json::to_vec(&request)
            .map_err(|err| HarnessError::HarnessConfig(format!("cannot encode invocation request: {err}")))?;
        let program = self.language.compose(&self.source);
        let outcome = run_program(&ProgramSpec {
            runtime: &self.runtime,
            source: &program,
            stdin: &stdin,
            timeout: self.timeout,
        })
        .map_err(sandbox_failure)?;
        interpret_outcome(&outcome, self.timeout)
    }
}

fn sandbox_failure(err: SandboxError) -> HarnessError {
    match err {
        SandboxError::RuntimeNotFound { .. } => HarnessError::HarnessConfig(err.to_string()),
        other => HarnessError::Invocation(other.to_string()),
    }
}

/// Maps a finished process to an invocation result. Timeout and non-zero
/// exit win over anything printed.
fn interpret_outcome(outcome: &ProcessOutcome, timeout: Duration) -> Result<InvocationResult, HarnessError> {
    if outcome.timed_out {
        return Err(HarnessError::Timeout {
            timeout_ms: u64::try_from(clamp_timeout(timeout).as_millis()).unwrap_or(u64::MAX),
        });
    }
    if !outcome.success() {
        let status = outcome
            .exit_code
            .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit status {code}"));
        let stderr = outcome.stderr_excerpt(STDERR_EXCERPT_CHARS);
        return Err(HarnessError::Invocation(if stderr.is_empty() {
            status
        } else {
            format!("{status}: {stderr}")
        }));
    }
    let line = outcome
        .result_line()
        .ok_or_else(|| HarnessError::Invocation("driver printed no result line".to_string()))?;
    let response: InvocationResponse = serde_json::from_str(line).map_err(|err| {
        HarnessError::Invocation(format!(
            "unparseable driver output ({err}): {}",
            excerpt(line, STDOUT_EXCERPT_CHARS)
        ))
    })?;
    response.into_result()
}
